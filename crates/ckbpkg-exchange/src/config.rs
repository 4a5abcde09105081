//! Export/import settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default base name prefix of profile members inside an archive
pub const DEFAULT_BASE_NAME_PREFIX: &str = "ckbprofile";

/// Default archive file extension, without the dot
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "ckb";

/// Default deflate level for archive members
pub const DEFAULT_COMPRESSION_LEVEL: i64 = 6;

/// Largest archive member that import will extract
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 1024 * 1024;

/// Settings shared by export and import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Members are named `{prefix}{index}.ini`
    pub base_name_prefix: String,
    /// Extension forced onto export destinations
    pub archive_extension: String,
    /// Deflate level; `None` uses the zip crate's default
    pub compression_level: Option<i64>,
    /// Members whose uncompressed size exceeds this are rejected
    pub max_entry_bytes: u64,
    /// Parent for scratch directories; the system temp dir when unset
    pub scratch_root: Option<PathBuf>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_name_prefix: DEFAULT_BASE_NAME_PREFIX.to_string(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            scratch_root: None,
        }
    }
}

impl ExchangeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn with_max_entry_bytes(mut self, limit: u64) -> Self {
        self.max_entry_bytes = limit;
        self
    }

    /// Base name of the member at `index` in export order
    pub fn base_name(&self, index: usize) -> String {
        format!("{}{}", self.base_name_prefix, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.base_name(0), "ckbprofile0");
        assert_eq!(config.base_name(12), "ckbprofile12");
        assert_eq!(config.archive_extension, "ckb");
        assert_eq!(config.compression_level, Some(6));
        assert!(config.scratch_root.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> TestResult {
        let config: ExchangeConfig = serde_json::from_str(r#"{"max_entry_bytes": 4096}"#)?;
        assert_eq!(config.max_entry_bytes, 4096);
        assert_eq!(config.base_name_prefix, DEFAULT_BASE_NAME_PREFIX);
        Ok(())
    }
}
