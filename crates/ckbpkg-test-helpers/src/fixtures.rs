//! Sample profiles and hand-built archives.
//!
//! The archive builder writes members exactly as given, so tests can
//! produce corrupted, truncated or hostile `.ckb` files that the real
//! writer would never emit.

use crate::must::{must_parse, must_with};
use ckbpkg_profile::{Profile, ProfileCollection, ProfileId};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use zip::{ZipWriter, write::SimpleFileOptions};

/// GUID of the "Work" sample profile
pub const WORK_GUID: &str = "{0f8fad5b-d9cb-469f-a165-70867728950e}";

/// GUID of the "Home" sample profile
pub const HOME_GUID: &str = "{7c9e6679-7425-40de-944b-e07fc1f90ae7}";

fn with_fields(mut profile: Profile, fields: &[(&str, &str)]) -> Profile {
    for (key, value) in fields {
        must_with(profile.set_field(*key, *value), "set fixture field");
    }
    profile
}

/// "Work" profile with a fixed GUID and a few opaque fields
pub fn work_profile() -> Profile {
    with_fields(
        Profile::with_id(must_parse::<ProfileId>(WORK_GUID), "Work"),
        &[
            ("HwModeCount", "1"),
            ("Mode0/Name", "Typing"),
            ("Mode0/Light/Color", "ffffff"),
        ],
    )
}

/// "Home" profile with a fixed GUID and a few opaque fields
pub fn home_profile() -> Profile {
    with_fields(
        Profile::with_id(must_parse::<ProfileId>(HOME_GUID), "Home"),
        &[
            ("HwModeCount", "2"),
            ("Mode0/Name", "Gaming"),
            ("Mode1/Name", "Media"),
            ("Mode0/Light/Color", "ff0000"),
        ],
    )
}

/// Collection holding Work then Home, Work selected
pub fn sample_collection() -> ProfileCollection {
    must_with(
        ProfileCollection::from_profiles(vec![work_profile(), home_profile()]),
        "build sample collection",
    )
}

/// Lowercase hex SHA-256 plus newline, as stored in `.ini.s256` members
pub fn digest_file_contents(content: &[u8]) -> String {
    format!("{}\n", hex::encode(Sha256::digest(content)))
}

/// Document text in the archive layout for a GUID, name and fields
pub fn document_text(guid: &str, name: &str, fields: &[(&str, &str)]) -> String {
    let mut text = format!("[{guid}]\nName={name}\n");
    for (key, value) in fields {
        text.push_str(key);
        text.push('=');
        text.push_str(value);
        text.push('\n');
    }
    text
}

/// Builds zip files member by member
#[derive(Debug, Default, Clone)]
pub struct ArchiveBuilder {
    members: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw member
    pub fn member(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.members.push((name.into(), content.into()));
        self
    }

    /// Add `<base>.ini` and a matching `<base>.ini.s256`
    pub fn pair(self, base: &str, document: impl Into<Vec<u8>>) -> Self {
        let document = document.into();
        let digest = digest_file_contents(&document);
        self.member(format!("{base}.ini"), document)
            .member(format!("{base}.ini.s256"), digest)
    }

    /// Add a pair whose digest was computed before the last byte was flipped
    pub fn tampered_pair(self, base: &str, document: impl Into<Vec<u8>>) -> Self {
        let original = document.into();
        let digest = digest_file_contents(&original);
        let mut tampered = original;
        if let Some(last) = tampered.last_mut() {
            *last ^= 0x20;
        }
        self.member(format!("{base}.ini"), tampered)
            .member(format!("{base}.ini.s256"), digest)
    }

    /// Add a pair whose digest file holds only the first `keep` hex characters
    pub fn truncated_digest_pair(self, base: &str, document: impl Into<Vec<u8>>, keep: usize) -> Self {
        let document = document.into();
        let digest: String = digest_file_contents(&document).chars().take(keep).collect();
        self.member(format!("{base}.ini"), document)
            .member(format!("{base}.ini.s256"), digest)
    }

    /// Write the zip to `path`
    ///
    /// # Errors
    ///
    /// Returns any IO or zip error.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut zip = ZipWriter::new(File::create(path)?);
        for (name, content) in &self.members {
            zip.start_file(name.as_str(), SimpleFileOptions::default())
                .map_err(io::Error::other)?;
            zip.write_all(content)?;
        }
        zip.finish().map_err(io::Error::other)?;
        Ok(())
    }
}
