//! Export and import orchestration
//!
//! [`ProfileExchange`] is the only piece that touches a device's
//! [`ProfileCollection`]. Export serializes and stamps the selected profiles
//! and hands them to the [`ArchiveWriter`]; import reads and verifies an
//! archive, resolves conflicts, removes the extracted files and then commits
//! the new profile set in one assignment.

use ckbpkg_profile::{ProfileCollection, ProfileId};
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ExchangeConfig;
use crate::document::{IniProfileSerializer, ProfileSerializer};
use crate::error::{ExchangeError, ExchangeResult};
use crate::integrity::IntegrityStamper;
use crate::reader::{ArchiveReader, RejectedCandidate};
use crate::resolver::{ConflictPolicy, ImportOutcome, ImportResolver, OutcomeKind};
use crate::scratch::{ScratchProvider, SystemScratch};
use crate::writer::{ArchiveEntry, ArchiveWriter};

/// One profile written to an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedProfile {
    pub id: ProfileId,
    pub name: String,
    pub base_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Final archive path, extension included
    pub archive_path: PathBuf,
    pub exported: Vec<ExportedProfile>,
}

/// Overall result of an import that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Every archive member was applied or already present
    Success,
    /// Some members were invalid or some conflicts skipped
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub archive_path: PathBuf,
    pub outcomes: Vec<ImportOutcome>,
    pub rejected: Vec<RejectedCandidate>,
}

impl ImportReport {
    fn count(&self, pred: impl Fn(&OutcomeKind) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.kind)).count()
    }

    pub fn imported(&self) -> usize {
        self.count(|k| matches!(k, OutcomeKind::Imported))
    }

    pub fn overwritten(&self) -> usize {
        self.count(|k| matches!(k, OutcomeKind::Overwritten))
    }

    pub fn renamed(&self) -> usize {
        self.count(|k| matches!(k, OutcomeKind::RenamedAsNew { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|k| matches!(k, OutcomeKind::Unchanged))
    }

    pub fn skipped(&self) -> usize {
        self.count(|k| matches!(k, OutcomeKind::Skipped { .. }))
    }

    pub fn invalid(&self) -> usize {
        self.rejected.len()
    }

    pub fn status(&self) -> ImportStatus {
        if self.skipped() == 0 && self.invalid() == 0 {
            ImportStatus::Success
        } else {
            ImportStatus::Partial
        }
    }
}

/// Verified archive content, listed without importing anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    pub archive_path: PathBuf,
    pub profiles: Vec<ExportedProfile>,
    pub rejected: Vec<RejectedCandidate>,
}

/// Export/import front end for one profile collection at a time
pub struct ProfileExchange<S = IniProfileSerializer> {
    config: ExchangeConfig,
    serializer: S,
    scratch: Arc<dyn ScratchProvider>,
}

impl<S> std::fmt::Debug for ProfileExchange<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileExchange")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProfileExchange<IniProfileSerializer> {
    /// `.ini` documents, scratch directories under `config.scratch_root`
    pub fn new(config: ExchangeConfig) -> Self {
        let scratch = Arc::new(SystemScratch::new(config.scratch_root.clone()));
        Self::with_parts(config, IniProfileSerializer, scratch)
    }
}

impl Default for ProfileExchange<IniProfileSerializer> {
    fn default() -> Self {
        Self::new(ExchangeConfig::default())
    }
}

impl<S: ProfileSerializer + Clone> ProfileExchange<S> {
    pub fn with_parts(config: ExchangeConfig, serializer: S, scratch: Arc<dyn ScratchProvider>) -> Self {
        Self {
            config,
            serializer,
            scratch,
        }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// `destination` with the archive extension appended unless it already
    /// has it (compared case-insensitively).
    pub fn archive_path(&self, destination: &Path) -> PathBuf {
        if self.has_archive_extension(destination) {
            return destination.to_path_buf();
        }
        let mut name = OsString::from(destination.as_os_str());
        name.push(".");
        name.push(&self.config.archive_extension);
        PathBuf::from(name)
    }

    fn has_archive_extension(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.config.archive_extension))
    }

    /// Write the selected profiles, in selection order, to an archive.
    /// Repeated ids are exported once.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::NothingSelected`] for an empty selection,
    /// [`ExchangeError::ProfileNotFound`] if an id is not in `collection`,
    /// otherwise whatever [`ArchiveWriter::write`] reports.
    pub fn export(
        &self,
        collection: &ProfileCollection,
        selection: &[ProfileId],
        destination: &Path,
    ) -> ExchangeResult<ExportReport> {
        if selection.is_empty() {
            return Err(ExchangeError::NothingSelected);
        }

        let mut seen = HashSet::with_capacity(selection.len());
        let mut entries = Vec::with_capacity(selection.len());
        let mut exported = Vec::with_capacity(selection.len());

        for id in selection {
            if !seen.insert(*id) {
                debug!(id = %id, "Profile selected twice, exporting once");
                continue;
            }
            let profile = collection
                .find(*id)
                .ok_or_else(|| ExchangeError::ProfileNotFound(id.to_string()))?;

            let content = self.serializer.serialize(profile).to_bytes();
            let digest = IntegrityStamper::digest(&content);
            let base_name = self.config.base_name(entries.len());

            exported.push(ExportedProfile {
                id: *id,
                name: profile.name().to_string(),
                base_name: base_name.clone(),
            });
            entries.push(ArchiveEntry::new(base_name, content, digest));
        }

        let archive_path = self.archive_path(destination);
        ArchiveWriter::new(self.scratch.clone(), self.config.compression_level)
            .write(&archive_path, &entries)?;

        info!(path = ?archive_path, profiles = exported.len(), "Profiles exported");
        Ok(ExportReport {
            archive_path,
            exported,
        })
    }

    /// Export every profile of the collection in list order.
    ///
    /// # Errors
    ///
    /// See [`export`](Self::export).
    pub fn export_all(
        &self,
        collection: &ProfileCollection,
        destination: &Path,
    ) -> ExchangeResult<ExportReport> {
        self.export(collection, &collection.ids(), destination)
    }

    /// List the verified profiles of an archive without importing them.
    ///
    /// # Errors
    ///
    /// Fails like [`import`](Self::import) before resolution, or with
    /// [`ExchangeError::Cleanup`] if the extracted files cannot be removed.
    pub fn inspect(&self, source: &Path) -> ExchangeResult<InspectReport> {
        let extracted = self.reader().read(source)?;
        let (candidates, rejected, scratch) = extracted.into_parts();
        let scratch_path = scratch.path().to_path_buf();
        scratch.close().map_err(|e| ExchangeError::Cleanup {
            path: scratch_path,
            source: e,
        })?;

        let profiles = candidates
            .iter()
            .map(|c| ExportedProfile {
                id: c.id(),
                name: c.name().to_string(),
                base_name: c.base_name.clone(),
            })
            .collect();

        Ok(InspectReport {
            archive_path: source.to_path_buf(),
            profiles,
            rejected,
        })
    }

    /// Import an archive into `collection`.
    ///
    /// Verified candidates are resolved against the collection with
    /// `policy` deciding conflicts. The extracted files are removed before
    /// the result is committed, so on any error the collection is unchanged.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::ArchiveRead`] if the archive cannot be opened,
    /// [`ExchangeError::Cleanup`] if the extracted files cannot be removed,
    /// [`ExchangeError::Commit`] if the resolved set is rejected by the
    /// collection.
    pub fn import(
        &self,
        collection: &mut ProfileCollection,
        source: &Path,
        policy: &mut dyn ConflictPolicy,
    ) -> ExchangeResult<ImportReport> {
        if !self.has_archive_extension(source) {
            warn!(
                path = ?source,
                expected = %self.config.archive_extension,
                "Importing a file without the archive extension"
            );
        }

        let extracted = self.reader().read(source)?;
        let (candidates, rejected, scratch) = extracted.into_parts();
        let resolution = ImportResolver::resolve(collection.profiles(), candidates, policy);

        let scratch_path = scratch.path().to_path_buf();
        scratch.close().map_err(|e| ExchangeError::Cleanup {
            path: scratch_path,
            source: e,
        })?;

        if resolution.has_changes() {
            collection.replace_profiles(resolution.profiles)?;
        }

        let report = ImportReport {
            archive_path: source.to_path_buf(),
            outcomes: resolution.outcomes,
            rejected,
        };
        info!(
            path = ?source,
            imported = report.imported(),
            overwritten = report.overwritten(),
            renamed = report.renamed(),
            skipped = report.skipped(),
            invalid = report.invalid(),
            "Profiles imported"
        );
        Ok(report)
    }

    fn reader(&self) -> ArchiveReader<S> {
        ArchiveReader::new(
            self.scratch.clone(),
            self.serializer.clone(),
            self.config.max_entry_bytes,
        )
    }
}
