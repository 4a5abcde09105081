//! File-backed persistence of a device's profile collection

use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::{debug, info};

use crate::ProfileCollection;

/// JSON file holding one [`ProfileCollection`].
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the collection, or a default one-profile collection if the file
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn load_or_default(&self) -> anyhow::Result<ProfileCollection> {
        if !async_fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to stat profile store: {:?}", self.path))?
        {
            debug!(path = ?self.path, "Profile store missing, starting with defaults");
            return Ok(ProfileCollection::default());
        }

        self.load().await
    }

    /// Load the collection from disk.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not hold a valid collection.
    pub async fn load(&self) -> anyhow::Result<ProfileCollection> {
        let content = async_fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read profile store: {:?}", self.path))?;

        let collection: ProfileCollection = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profile store: {:?}", self.path))?;

        debug!(path = ?self.path, profiles = collection.len(), "Profile store loaded");
        Ok(collection)
    }

    /// Persist the collection atomically.
    ///
    /// The JSON is written to a sibling temp file which is then renamed over
    /// the target, so an interrupted save never truncates the existing store.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the file cannot be written.
    pub async fn save(&self, collection: &ProfileCollection) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            async_fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create store directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(collection)
            .context("Failed to serialize profile collection")?;

        let temp_path = self.path.with_extension("json.tmp");
        async_fs::write(&temp_path, json)
            .await
            .with_context(|| format!("Failed to write temp file: {:?}", temp_path))?;

        async_fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to rename temp file to target: {:?}", self.path))?;

        info!(path = ?self.path, profiles = collection.len(), "Profile store saved");
        Ok(())
    }
}
