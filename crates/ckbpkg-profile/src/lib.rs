//! Profile types and collection management
//!
//! This crate provides the profile model for ckb devices: GUID-identified,
//! named configuration sets whose content is otherwise opaque, the ordered
//! per-device collection they live in, and a JSON store for that collection.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod collection;
pub mod store;
pub mod types;
pub mod validation;

pub use collection::ProfileCollection;
pub use store::ProfileStore;
pub use types::{Profile, ProfileId};
pub use validation::{normalize_name, validate_field_key};

use thiserror::Error;

/// Reserved document key holding the display name.
pub const NAME_KEY: &str = "Name";

/// Name given to profiles whose name is blank.
pub const UNNAMED_PROFILE: &str = "Unnamed";

/// Name of the profile a fresh collection starts with.
pub const DEFAULT_PROFILE: &str = "Default";

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile reference is ambiguous: {0}")]
    Ambiguous(String),

    #[error("Cannot remove the last profile of a device")]
    LastProfile,

    #[error("Duplicate profile id: {0}")]
    DuplicateId(String),

    #[error("Invalid profile id: {0}")]
    InvalidId(String),

    #[error("Field key is reserved: {0}")]
    ReservedField(String),

    #[error("Invalid field key: {0}")]
    InvalidFieldKey(String),
}

pub type ProfileResult<T> = Result<T, ProfileError>;
