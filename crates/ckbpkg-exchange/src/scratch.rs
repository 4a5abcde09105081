//! Scoped scratch directories
//!
//! Every export or import gets its own freshly created directory. The
//! directory and everything in it is removed when the [`ScratchDir`] is
//! closed or dropped, so concurrent operations never share files.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix of every scratch directory name
pub const SCRATCH_PREFIX: &str = "ckbpkg-";

/// Hands out scratch directories for one operation each
pub trait ScratchProvider: Send + Sync {
    /// # Errors
    ///
    /// Fails if the directory cannot be created.
    fn create(&self) -> io::Result<ScratchDir>;
}

/// Removes a scratch directory tree in place of the default removal
pub type Remover = Box<dyn FnOnce(&Path) -> io::Result<()> + Send>;

/// A scratch directory owned by one operation
pub struct ScratchDir {
    dir: TempDir,
    remover: Option<Remover>,
}

impl fmt::Debug for ScratchDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchDir")
            .field("path", &self.dir.path())
            .field("custom_remover", &self.remover.is_some())
            .finish()
    }
}

impl ScratchDir {
    pub fn new(dir: TempDir) -> Self {
        Self { dir, remover: None }
    }

    /// Wrap `dir`, removing it with `remover` on [`close`](Self::close).
    ///
    /// Whatever `remover` leaves behind is still removed, silently, when
    /// the handle drops.
    pub fn with_remover(dir: TempDir, remover: Remover) -> Self {
        Self {
            dir,
            remover: Some(remover),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory, reporting failure instead of swallowing it.
    ///
    /// # Errors
    ///
    /// Returns the IO error from removing the directory tree.
    pub fn close(self) -> io::Result<()> {
        let Self { dir, remover } = self;
        let path = dir.path().to_path_buf();
        let result = match remover {
            Some(remove) => {
                let result = remove(&path);
                drop(dir);
                result
            }
            None => dir.close(),
        };

        match result {
            Ok(()) => {
                debug!(path = ?path, "Scratch directory removed");
                Ok(())
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to remove scratch directory");
                Err(e)
            }
        }
    }
}

/// Scratch directories under a fixed root, or the system temp dir
#[derive(Debug, Clone, Default)]
pub struct SystemScratch {
    root: Option<PathBuf>,
}

impl SystemScratch {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl ScratchProvider for SystemScratch {
    fn create(&self) -> io::Result<ScratchDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!(path = ?dir.path(), "Scratch directory created");
        Ok(ScratchDir::new(dir))
    }
}
