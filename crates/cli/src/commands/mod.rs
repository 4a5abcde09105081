//! Command implementations for ckbpkgctl

pub mod exchange;
pub mod manage;

use anyhow::Result;
use ckbpkg_exchange::{ConflictDecision, ExchangeConfig, ProfileExchange};
use ckbpkg_profile::{ProfileCollection, ProfileStore};
use clap::ValueEnum;
use std::sync::Arc;

/// Direction for `move`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

/// How `import` settles GUID conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConflictMode {
    /// Prompt for each conflict
    #[default]
    Ask,
    /// Keep existing profiles
    Skip,
    /// Replace existing profiles
    Overwrite,
    /// Import conflicting profiles under new GUIDs
    Rename,
}

impl ConflictMode {
    /// Fixed decision, or `None` when the user is asked
    pub fn fixed(self) -> Option<ConflictDecision> {
        match self {
            Self::Ask => None,
            Self::Skip => Some(ConflictDecision::Skip),
            Self::Overwrite => Some(ConflictDecision::Overwrite),
            Self::Rename => Some(ConflictDecision::RenameAsNew),
        }
    }
}

/// How a successful command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    Partial,
}

/// Shared state of one invocation
pub struct Context {
    pub store: ProfileStore,
    pub exchange: Arc<ProfileExchange>,
    pub json: bool,
}

impl Context {
    pub fn new(store: ProfileStore, config: ExchangeConfig, json: bool) -> Self {
        Self {
            store,
            exchange: Arc::new(ProfileExchange::new(config)),
            json,
        }
    }

    pub async fn load(&self) -> Result<ProfileCollection> {
        self.store.load_or_default().await
    }

    pub async fn save(&self, collection: &ProfileCollection) -> Result<()> {
        self.store.save(collection).await
    }
}
