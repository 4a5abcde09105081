//! `.ckb` archive packaging
//!
//! Each entry is materialized as `<base>.ini` and `<base>.ini.s256` inside a
//! scratch directory, then the files are deflated into one zip. The zip is
//! built in a temp file next to the destination and only moved into place
//! once complete, so a failed write never leaves a partial archive behind.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::{ExchangeError, ExchangeResult};
use crate::integrity::{DIGEST_SUFFIX, Digest, IntegrityStamper};
use crate::scratch::{ScratchDir, ScratchProvider};

/// Extension of document members inside an archive
pub const DOCUMENT_SUFFIX: &str = ".ini";

/// One serialized profile ready for packaging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub base_name: String,
    pub content: Vec<u8>,
    pub digest: Digest,
}

impl ArchiveEntry {
    pub fn new(base_name: impl Into<String>, content: Vec<u8>, digest: Digest) -> Self {
        Self {
            base_name: base_name.into(),
            content,
            digest,
        }
    }

    /// Entry whose digest is computed from `content`
    pub fn stamped(base_name: impl Into<String>, content: Vec<u8>) -> Self {
        let digest = IntegrityStamper::digest(&content);
        Self::new(base_name, content, digest)
    }

    pub fn document_member(&self) -> String {
        format!("{}{}", self.base_name, DOCUMENT_SUFFIX)
    }

    pub fn digest_member(&self) -> String {
        format!("{}{}{}", self.base_name, DOCUMENT_SUFFIX, DIGEST_SUFFIX)
    }
}

/// Writes archives through per-call scratch directories
pub struct ArchiveWriter {
    scratch: Arc<dyn ScratchProvider>,
    compression_level: Option<i64>,
}

impl std::fmt::Debug for ArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("compression_level", &self.compression_level)
            .finish_non_exhaustive()
    }
}

impl ArchiveWriter {
    pub fn new(scratch: Arc<dyn ScratchProvider>, compression_level: Option<i64>) -> Self {
        Self {
            scratch,
            compression_level,
        }
    }

    /// Package `entries` into a zip at `archive_path`, replacing any file
    /// already there. Members appear in entry order, document before digest.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::ArchiveWrite`] for invalid or repeated base
    /// names and for any failure producing the archive, and
    /// [`ExchangeError::Cleanup`] if the archive was written but the scratch
    /// directory could not be removed.
    pub fn write(&self, archive_path: &Path, entries: &[ArchiveEntry]) -> ExchangeResult<()> {
        check_base_names(archive_path, entries)?;

        let scratch = self
            .scratch
            .create()
            .map_err(|e| ExchangeError::archive_write(archive_path, e))?;
        let scratch_path = scratch.path().to_path_buf();

        let result = self.write_with(&scratch, archive_path, entries);
        let cleanup = scratch.close();

        match (result, cleanup) {
            (Ok(()), Ok(())) => {
                info!(
                    path = ?archive_path,
                    profiles = entries.len(),
                    "Archive written"
                );
                Ok(())
            }
            (Ok(()), Err(source)) => Err(ExchangeError::Cleanup {
                path: scratch_path,
                source,
            }),
            (Err(e), _) => {
                warn!(path = ?archive_path, error = %e, "Archive write failed");
                Err(e)
            }
        }
    }

    fn write_with(
        &self,
        scratch: &ScratchDir,
        archive_path: &Path,
        entries: &[ArchiveEntry],
    ) -> ExchangeResult<()> {
        let mut members = Vec::with_capacity(entries.len().saturating_mul(2));
        for entry in entries {
            let document = entry.document_member();
            let digest = entry.digest_member();
            fs::write(scratch.path().join(&document), &entry.content)
                .map_err(|e| ExchangeError::archive_write(archive_path, e))?;
            fs::write(
                scratch.path().join(&digest),
                entry.digest.to_file_contents(),
            )
            .map_err(|e| ExchangeError::archive_write(archive_path, e))?;
            debug!(base_name = %entry.base_name, bytes = entry.content.len(), "Document staged");
            members.push(document);
            members.push(digest);
        }

        let parent = match archive_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut staged = tempfile::Builder::new()
            .prefix(".ckbpkg-")
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|e| ExchangeError::archive_write(archive_path, e))?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.compression_level);

        let mut zip = ZipWriter::new(staged.as_file_mut());
        for member in &members {
            self.add_file_to_zip(&mut zip, &options, scratch.path(), member)
                .map_err(|e| ExchangeError::archive_write(archive_path, e))?;
        }
        zip.finish()
            .map_err(|e| ExchangeError::archive_write(archive_path, e))?;

        staged
            .as_file()
            .sync_all()
            .map_err(|e| ExchangeError::archive_write(archive_path, e))?;
        staged
            .persist(archive_path)
            .map_err(|e| ExchangeError::archive_write(archive_path, e.error))?;

        Ok(())
    }

    fn add_file_to_zip<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: &SimpleFileOptions,
        dir: &Path,
        member: &str,
    ) -> Result<(), String> {
        let content = fs::read(dir.join(member)).map_err(|e| e.to_string())?;
        zip.start_file(member, *options)
            .map_err(|e| e.to_string())?;
        zip.write_all(&content).map_err(|e| e.to_string())?;
        debug!(member, bytes = content.len(), "Member added");
        Ok(())
    }
}

fn check_base_names(archive_path: &Path, entries: &[ArchiveEntry]) -> ExchangeResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        let name = entry.base_name.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.chars().any(char::is_control)
        {
            return Err(ExchangeError::archive_write(
                archive_path,
                format!("invalid member base name {name:?}"),
            ));
        }
        if !seen.insert(name) {
            return Err(ExchangeError::archive_write(
                archive_path,
                format!("duplicate member base name {name:?}"),
            ));
        }
    }
    Ok(())
}
