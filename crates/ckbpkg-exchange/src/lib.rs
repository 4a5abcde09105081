//! Profile export and import for ckb devices
//!
//! This crate packages profiles into portable `.ckb` archives and restores
//! them with integrity checking and conflict resolution:
//! - Deterministic `.ini` documents, one per profile, grouped by GUID
//! - SHA-256 companion files (`.ini.s256`) verified before anything is parsed
//! - Deflated zip packaging written through a temp file, never left partial
//! - Per-candidate conflict decisions (skip, overwrite, import as new)
//!
//! # Architecture
//!
//! - [`document`]: `SerializedDocument` and the `ProfileSerializer` seam
//! - [`integrity`]: digests and their companion-file encoding
//! - [`writer`]: `ArchiveWriter`
//! - [`reader`]: `ArchiveReader`, import candidates and rejections
//! - [`resolver`]: `ImportResolver` and conflict policies
//! - [`controller`]: `ProfileExchange`, the export/import entry point
//! - [`scratch`]: per-operation scratch directories
//! - [`config`]: `ExchangeConfig`
//! - [`error`]: error types
//!
//! Every operation works in its own scratch directory, which is removed on
//! success and on failure.
//!
//! # Example
//!
//! ```no_run
//! use ckbpkg_exchange::prelude::*;
//! use ckbpkg_profile::ProfileCollection;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), ExchangeError> {
//! let exchange = ProfileExchange::new(ExchangeConfig::default());
//! let mut collection = ProfileCollection::default();
//!
//! let report = exchange.export_all(&collection, Path::new("profiles"))?;
//! let imported = exchange.import(
//!     &mut collection,
//!     &report.archive_path,
//!     &mut ConflictDecision::Skip,
//! )?;
//! println!("{} imported", imported.imported());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod integrity;
pub mod prelude;
pub mod reader;
pub mod resolver;
pub mod scratch;
pub mod writer;

pub use config::ExchangeConfig;
pub use controller::{ExportReport, ImportReport, ImportStatus, InspectReport, ProfileExchange};
pub use document::{IniProfileSerializer, ProfileFields, ProfileSerializer, SerializedDocument};
pub use error::{DigestMismatchError, ExchangeError, ExchangeResult, SerializationError};
pub use integrity::{Digest, IntegrityStamper};
pub use reader::{ArchiveReader, ImportCandidate, RejectReason, RejectedCandidate};
pub use resolver::{ConflictDecision, ConflictPolicy, ImportResolver};
pub use writer::{ArchiveEntry, ArchiveWriter};
