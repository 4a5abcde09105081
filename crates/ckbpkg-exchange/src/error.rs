//! Error types for profile export and import

use std::path::PathBuf;
use thiserror::Error;

use crate::integrity::Digest;

/// Errors that abort an export or import operation as a whole
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// A profile could not be turned into a document, or a document back into a profile
    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    /// The archive could not be produced
    #[error("Failed to write archive {path}: {reason}")]
    ArchiveWrite {
        /// Destination archive path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The archive could not be opened or extracted at all
    #[error("Failed to read archive {path}: {reason}")]
    ArchiveRead {
        /// Source archive path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A selected profile is not part of the collection
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Export was requested with an empty selection
    #[error("No profiles selected for export")]
    NothingSelected,

    /// The resolved profile set could not be committed to the collection
    #[error("Failed to commit imported profiles: {0}")]
    Commit(#[from] ckbpkg_profile::ProfileError),

    /// Scratch files of a finished operation could not be removed
    #[error("Failed to clean up scratch directory {path}: {source}")]
    Cleanup {
        /// Scratch directory that was left behind
        path: PathBuf,
        /// Source error
        source: std::io::Error,
    },

    /// IO error outside archive handling (scratch setup, temp files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for export and import operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// Check if retrying the same operation could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Serialization(_) => false,
            Self::ArchiveWrite { .. } => true,
            Self::ArchiveRead { .. } => false,
            Self::ProfileNotFound(_) => false,
            Self::NothingSelected => false,
            Self::Commit(_) => false,
            Self::Cleanup { .. } => true,
            Self::Io(_) => true,
        }
    }

    /// Create an archive write error
    pub fn archive_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArchiveWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an archive read error
    pub fn archive_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArchiveRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A serialized profile document is malformed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Document has no group header
    #[error("Document has no profile group")]
    MissingGroup,

    /// Document holds more than one group
    #[error("Unexpected second group [{0}]")]
    UnexpectedGroup(String),

    /// Group name is not a GUID
    #[error("Group name is not a profile GUID: {0}")]
    InvalidGuid(String),

    /// Required `Name` key is absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A line could not be parsed
    #[error("Malformed line {line}: {reason}")]
    MalformedLine {
        /// 1-based line number
        line: usize,
        /// Why the line was rejected
        reason: String,
    },

    /// The same key occurs twice in the group
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Document is not UTF-8 text
    #[error("Document is not valid UTF-8: {0}")]
    Encoding(String),

    /// A field is not acceptable as profile content
    #[error("Invalid profile field: {0}")]
    InvalidField(String),
}

/// A document's bytes do not hash to the digest stored next to it.
///
/// Never fatal: the affected import candidate is dropped and reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Digest mismatch for {member}: expected {expected}, computed {actual}")]
pub struct DigestMismatchError {
    /// Archive member whose content failed verification
    pub member: String,
    /// Digest stored in the companion file
    pub expected: Digest,
    /// Digest of the member's actual bytes
    pub actual: Digest,
}

/// A companion digest file does not hold a usable SHA-256 value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedDigestError {
    /// The digest file could not be read
    #[error("Digest file unreadable: {0}")]
    Unreadable(String),

    /// The text is not hexadecimal
    #[error("Digest is not hex: {0}")]
    InvalidHex(String),

    /// The decoded value has the wrong size
    #[error("Digest has {actual} bytes, expected {expected}")]
    WrongLength {
        /// Required byte length
        expected: usize,
        /// Decoded byte length
        actual: usize,
    },
}
