//! Error types for ckbpkgctl

use ckbpkg_exchange::ExchangeError;
use ckbpkg_profile::ProfileError;
use thiserror::Error;

/// Exit code for an import that skipped or dropped profiles
pub const EXIT_PARTIAL: u8 = 2;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Profile reference is ambiguous, use the GUID: {0}")]
    AmbiguousProfile(String),

    #[error("Cannot delete the last profile")]
    LastProfile,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Profile(ProfileError),

    #[error(transparent)]
    Exchange(ExchangeError),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ProfileNotFound(_) => 3,
            Self::LastProfile => 4,
            Self::AmbiguousProfile(_)
            | Self::InvalidConfiguration(_)
            | Self::Profile(_)
            | Self::Exchange(_) => 1,
        }
    }
}

impl From<ProfileError> for CliError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(reference) => Self::ProfileNotFound(reference),
            ProfileError::Ambiguous(reference) => Self::AmbiguousProfile(reference),
            ProfileError::LastProfile => Self::LastProfile,
            other => Self::Profile(other),
        }
    }
}

impl From<ExchangeError> for CliError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::ProfileNotFound(reference) => Self::ProfileNotFound(reference),
            ExchangeError::Commit(inner) => inner.into(),
            other => Self::Exchange(other),
        }
    }
}
