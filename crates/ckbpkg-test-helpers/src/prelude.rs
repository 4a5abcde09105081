//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use ckbpkg_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_parse, must_some, must_with};
pub use crate::{assert_dir_empty, assertions::dir_entries};

#[cfg(feature = "fixtures")]
pub use crate::assert_archive_members;

#[cfg(feature = "fixtures")]
pub use crate::fixtures::{
    ArchiveBuilder, HOME_GUID, WORK_GUID, digest_file_contents, document_text, home_profile,
    sample_collection, work_profile,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
