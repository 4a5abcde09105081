//! Convenience re-exports for common types

pub use crate::config::ExchangeConfig;
pub use crate::controller::{
    ExportReport, ExportedProfile, ImportReport, ImportStatus, InspectReport, ProfileExchange,
};
pub use crate::error::{ExchangeError, ExchangeResult};
pub use crate::reader::{RejectReason, RejectedCandidate};
pub use crate::resolver::{
    Conflict, ConflictDecision, ConflictPolicy, ImportOutcome, OutcomeKind, SkipReason,
};

pub use ckbpkg_profile::{Profile, ProfileCollection, ProfileId};
