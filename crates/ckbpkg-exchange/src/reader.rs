//! `.ckb` archive extraction and verification
//!
//! The archive is unpacked into a scratch directory in member order. Every
//! `<base>.ini` is then paired with `<base>.ini.s256`, its digest checked
//! against the extracted bytes, and only then parsed. Anything that fails a
//! step becomes a [`RejectedCandidate`]; only an archive that cannot be
//! opened at all fails the read.

use ckbpkg_profile::{Profile, ProfileId};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::document::{ProfileSerializer, SerializedDocument};
use crate::error::{
    DigestMismatchError, ExchangeError, ExchangeResult, MalformedDigestError, SerializationError,
};
use crate::integrity::{DIGEST_SUFFIX, Digest, IntegrityStamper};
use crate::scratch::{ScratchDir, ScratchProvider};
use crate::writer::DOCUMENT_SUFFIX;

/// A verified profile found in an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCandidate {
    /// Shared base name of the document/digest pair
    pub base_name: String,
    /// Digest the document was verified against
    pub digest: Digest,
    /// The verified document as parsed
    pub document: SerializedDocument,
    /// Profile rebuilt from the document
    pub profile: Profile,
}

impl ImportCandidate {
    pub fn id(&self) -> ProfileId {
        self.profile.id()
    }

    pub fn name(&self) -> &str {
        self.profile.name()
    }
}

/// Why an archive member did not become a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingDigest,
    MalformedDigest(MalformedDigestError),
    DigestMismatch(DigestMismatchError),
    Unparseable(SerializationError),
    UnsafePath,
    TooLarge { size: u64, limit: u64 },
    Unreadable(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDigest => f.write_str("no digest file"),
            Self::MalformedDigest(e) => write!(f, "{e}"),
            Self::DigestMismatch(e) => write!(f, "{e}"),
            Self::Unparseable(e) => write!(f, "{e}"),
            Self::UnsafePath => f.write_str("path escapes the archive"),
            Self::TooLarge { size, limit } => {
                write!(f, "member is {size} bytes, limit is {limit}")
            }
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
        }
    }
}

/// An archive member dropped from import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    pub member: String,
    pub reason: RejectReason,
}

/// Result of reading an archive. Holds the scratch directory with the
/// extracted files until [`close`](Self::close) or drop.
#[derive(Debug)]
pub struct ExtractedArchive {
    scratch: ScratchDir,
    candidates: Vec<ImportCandidate>,
    rejected: Vec<RejectedCandidate>,
}

impl ExtractedArchive {
    pub fn candidates(&self) -> &[ImportCandidate] {
        &self.candidates
    }

    pub fn rejected(&self) -> &[RejectedCandidate] {
        &self.rejected
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Split into the candidate lists and the scratch directory still
    /// holding the extracted files.
    pub fn into_parts(self) -> (Vec<ImportCandidate>, Vec<RejectedCandidate>, ScratchDir) {
        (self.candidates, self.rejected, self.scratch)
    }

    /// Remove the extracted files.
    ///
    /// # Errors
    ///
    /// Returns the IO error from removing the scratch directory.
    pub fn close(self) -> io::Result<()> {
        self.scratch.close()
    }
}

/// Reads archives through per-call scratch directories
pub struct ArchiveReader<S> {
    scratch: Arc<dyn ScratchProvider>,
    serializer: S,
    max_entry_bytes: u64,
}

impl<S> fmt::Debug for ArchiveReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("max_entry_bytes", &self.max_entry_bytes)
            .finish_non_exhaustive()
    }
}

impl<S: ProfileSerializer> ArchiveReader<S> {
    pub fn new(scratch: Arc<dyn ScratchProvider>, serializer: S, max_entry_bytes: u64) -> Self {
        Self {
            scratch,
            serializer,
            max_entry_bytes,
        }
    }

    /// Extract and verify `archive_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::ArchiveRead`] if the file is not a readable
    /// zip archive or holds no members, and [`ExchangeError::Io`] if the
    /// scratch directory cannot be set up. Per-member problems never fail
    /// the read.
    pub fn read(&self, archive_path: &Path) -> ExchangeResult<ExtractedArchive> {
        let file =
            File::open(archive_path).map_err(|e| ExchangeError::archive_read(archive_path, e))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| ExchangeError::archive_read(archive_path, e))?;
        if archive.is_empty() {
            return Err(ExchangeError::archive_read(
                archive_path,
                "archive has no members",
            ));
        }

        let scratch = self.scratch.create()?;
        let mut rejected = Vec::new();
        let extracted = match self.extract(&mut archive, &scratch, &mut rejected) {
            Ok(members) => members,
            Err(e) => {
                if let Err(cleanup) = scratch.close() {
                    debug!(error = %cleanup, "Scratch cleanup after failed read also failed");
                }
                return Err(e);
            }
        };

        let candidates = self.verify(&scratch, &extracted, &mut rejected);

        for reject in &rejected {
            warn!(
                archive = ?archive_path,
                member = %reject.member,
                reason = %reject.reason,
                "Dropping import candidate"
            );
        }
        info!(
            archive = ?archive_path,
            candidates = candidates.len(),
            rejected = rejected.len(),
            "Archive read"
        );

        Ok(ExtractedArchive {
            scratch,
            candidates,
            rejected,
        })
    }

    fn extract(
        &self,
        archive: &mut ZipArchive<File>,
        scratch: &ScratchDir,
        rejected: &mut Vec<RejectedCandidate>,
    ) -> ExchangeResult<Vec<String>> {
        let mut members = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let listed = archive
                .name_for_index(index)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{index}"));
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    rejected.push(RejectedCandidate {
                        member: listed,
                        reason: RejectReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };
            let name = entry.name().to_string();

            if entry.is_dir() {
                continue;
            }

            let Some(relative) = entry.enclosed_name() else {
                rejected.push(RejectedCandidate {
                    member: name,
                    reason: RejectReason::UnsafePath,
                });
                continue;
            };

            if relative.components().count() != 1
                || !matches!(relative.components().next(), Some(Component::Normal(_)))
            {
                debug!(member = %name, "Ignoring nested archive member");
                continue;
            }

            if entry.size() > self.max_entry_bytes {
                rejected.push(RejectedCandidate {
                    member: name,
                    reason: RejectReason::TooLarge {
                        size: entry.size(),
                        limit: self.max_entry_bytes,
                    },
                });
                continue;
            }

            let mut content = Vec::new();
            if let Err(e) = (&mut entry)
                .take(self.max_entry_bytes.saturating_add(1))
                .read_to_end(&mut content)
            {
                rejected.push(RejectedCandidate {
                    member: name,
                    reason: RejectReason::Unreadable(e.to_string()),
                });
                continue;
            }
            let size = content.len() as u64;
            if size > self.max_entry_bytes {
                rejected.push(RejectedCandidate {
                    member: name,
                    reason: RejectReason::TooLarge {
                        size,
                        limit: self.max_entry_bytes,
                    },
                });
                continue;
            }

            fs::write(scratch.path().join(&relative), &content)?;
            debug!(member = %name, bytes = content.len(), "Member extracted");
            members.push(relative.to_string_lossy().into_owned());
        }

        Ok(members)
    }

    fn verify(
        &self,
        scratch: &ScratchDir,
        members: &[String],
        rejected: &mut Vec<RejectedCandidate>,
    ) -> Vec<ImportCandidate> {
        let present: HashSet<&str> = members.iter().map(String::as_str).collect();
        let mut candidates = Vec::new();

        for member in members {
            let Some(base_name) = member.strip_suffix(DOCUMENT_SUFFIX) else {
                if !member.ends_with(DIGEST_SUFFIX) {
                    debug!(member = %member, "Ignoring unrelated archive member");
                }
                continue;
            };

            let digest_member = format!("{member}{DIGEST_SUFFIX}");
            if !present.contains(digest_member.as_str()) {
                rejected.push(RejectedCandidate {
                    member: member.clone(),
                    reason: RejectReason::MissingDigest,
                });
                continue;
            }

            match self.verify_pair(scratch.path(), member, &digest_member) {
                Ok((digest, document, profile)) => {
                    debug!(member = %member, id = %profile.id(), "Candidate verified");
                    candidates.push(ImportCandidate {
                        base_name: base_name.to_string(),
                        digest,
                        document,
                        profile,
                    });
                }
                Err(reason) => rejected.push(RejectedCandidate {
                    member: member.clone(),
                    reason,
                }),
            }
        }

        candidates
    }

    fn verify_pair(
        &self,
        dir: &Path,
        member: &str,
        digest_member: &str,
    ) -> Result<(Digest, SerializedDocument, Profile), RejectReason> {
        let digest_file = File::open(dir.join(digest_member))
            .map_err(|e| RejectReason::Unreadable(e.to_string()))?;
        let expected = Digest::read_from(digest_file).map_err(RejectReason::MalformedDigest)?;

        let bytes =
            fs::read(dir.join(member)).map_err(|e| RejectReason::Unreadable(e.to_string()))?;
        if !IntegrityStamper::verify(&bytes, &expected) {
            return Err(RejectReason::DigestMismatch(DigestMismatchError {
                member: member.to_string(),
                expected,
                actual: IntegrityStamper::digest(&bytes),
            }));
        }

        let document = SerializedDocument::parse(&bytes).map_err(RejectReason::Unparseable)?;
        let profile = self
            .serializer
            .deserialize(&document)
            .and_then(|fields| fields.into_profile())
            .map_err(RejectReason::Unparseable)?;

        Ok((expected, document, profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::IniProfileSerializer;
    use crate::scratch::SystemScratch;
    use crate::scratch::failing::FailingScratch;
    use crate::writer::{ArchiveEntry, ArchiveWriter};
    use std::io::Write;
    use tracing_test::traced_test;
    use zip::{ZipWriter, write::SimpleFileOptions};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    struct Fixture {
        dir: tempfile::TempDir,
        scratch: Arc<dyn ScratchProvider>,
    }

    impl Fixture {
        fn new() -> Result<Self, Box<dyn std::error::Error>> {
            let dir = tempfile::tempdir()?;
            let scratch: Arc<dyn ScratchProvider> =
                Arc::new(SystemScratch::new(Some(dir.path().join("scratch"))));
            Ok(Self { dir, scratch })
        }

        fn reader(&self) -> ArchiveReader<IniProfileSerializer> {
            ArchiveReader::new(self.scratch.clone(), IniProfileSerializer, 1024 * 1024)
        }

        fn path(&self, name: &str) -> std::path::PathBuf {
            self.dir.path().join(name)
        }

        fn scratch_is_empty(&self) -> Result<bool, Box<dyn std::error::Error>> {
            Ok(fs::read_dir(self.dir.path().join("scratch"))?.count() == 0)
        }
    }

    fn profile_entry(base: &str, name: &str) -> Result<(ArchiveEntry, Profile), Box<dyn std::error::Error>> {
        let profile = Profile::new(name).with_field("Mode0/Name", "Typing")?;
        let bytes = IniProfileSerializer.serialize(&profile).to_bytes();
        Ok((ArchiveEntry::stamped(base, bytes), profile))
    }

    fn raw_zip(path: &Path, members: &[(&str, &[u8])]) -> TestResult {
        let mut zip = ZipWriter::new(File::create(path)?);
        for (name, content) in members {
            zip.start_file(*name, SimpleFileOptions::default())?;
            zip.write_all(content)?;
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn test_written_archive_reads_back() -> TestResult {
        let fx = Fixture::new()?;
        let (work, work_profile) = profile_entry("ckbprofile0", "Work")?;
        let (home, home_profile) = profile_entry("ckbprofile1", "Home")?;
        let path = fx.path("out.ckb");
        ArchiveWriter::new(fx.scratch.clone(), Some(6)).write(&path, &[work, home])?;

        let extracted = fx.reader().read(&path)?;
        let pairs: Vec<(ProfileId, &str)> = extracted
            .candidates()
            .iter()
            .map(|c| (c.id(), c.name()))
            .collect();
        assert_eq!(
            pairs,
            vec![(work_profile.id(), "Work"), (home_profile.id(), "Home")]
        );
        assert!(extracted.rejected().is_empty());
        assert_eq!(extracted.candidates()[1].profile, home_profile);

        assert!(extracted.scratch_path().join("ckbprofile0.ini").exists());
        extracted.close()?;
        assert!(fx.scratch_is_empty()?);
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_truncated_digest_drops_only_that_candidate() -> TestResult {
        let fx = Fixture::new()?;
        let (good, good_profile) = profile_entry("ckbprofile0", "Work")?;
        let (bad, _) = profile_entry("ckbprofile1", "Home")?;
        let truncated = bad.digest.to_hex();
        let truncated = truncated.get(..10).unwrap_or_default();

        let path = fx.path("mixed.ckb");
        raw_zip(
            &path,
            &[
                ("ckbprofile0.ini", good.content.as_slice()),
                ("ckbprofile0.ini.s256", good.digest.to_file_contents().as_bytes()),
                ("ckbprofile1.ini", bad.content.as_slice()),
                ("ckbprofile1.ini.s256", truncated.as_bytes()),
            ],
        )?;

        let extracted = fx.reader().read(&path)?;
        assert_eq!(extracted.candidates().len(), 1);
        assert_eq!(extracted.candidates()[0].id(), good_profile.id());
        assert_eq!(extracted.rejected().len(), 1);
        assert_eq!(extracted.rejected()[0].member, "ckbprofile1.ini");
        assert!(matches!(
            extracted.rejected()[0].reason,
            RejectReason::MalformedDigest(_)
        ));
        assert!(logs_contain("Dropping import candidate"));
        extracted.close()?;
        Ok(())
    }

    #[test]
    fn test_tampered_document_is_rejected() -> TestResult {
        let fx = Fixture::new()?;
        let (entry, _) = profile_entry("ckbprofile0", "Work")?;
        let mut tampered = entry.content.clone();
        if let Some(last) = tampered.last_mut() {
            *last ^= 0x01;
        }

        let path = fx.path("tampered.ckb");
        raw_zip(
            &path,
            &[
                ("ckbprofile0.ini", tampered.as_slice()),
                ("ckbprofile0.ini.s256", entry.digest.to_file_contents().as_bytes()),
            ],
        )?;

        let extracted = fx.reader().read(&path)?;
        assert!(extracted.candidates().is_empty());
        match &extracted.rejected()[0].reason {
            RejectReason::DigestMismatch(e) => {
                assert_eq!(e.expected, entry.digest);
                assert_eq!(e.actual, IntegrityStamper::digest(&tampered));
            }
            other => return Err(format!("unexpected reason {other:?}").into()),
        }
        Ok(())
    }

    #[test]
    fn test_missing_digest_and_unparseable_document() -> TestResult {
        let fx = Fixture::new()?;
        let junk = b"this is not an ini document".to_vec();
        let junk_digest = IntegrityStamper::digest(&junk);
        let (lonely, _) = profile_entry("ckbprofile1", "Home")?;

        let path = fx.path("broken.ckb");
        raw_zip(
            &path,
            &[
                ("ckbprofile0.ini", junk.as_slice()),
                ("ckbprofile0.ini.s256", junk_digest.to_file_contents().as_bytes()),
                ("ckbprofile1.ini", lonely.content.as_slice()),
                ("readme.txt", b"hello".as_slice()),
            ],
        )?;

        let extracted = fx.reader().read(&path)?;
        assert!(extracted.candidates().is_empty());
        let reasons: Vec<&RejectReason> = extracted.rejected().iter().map(|r| &r.reason).collect();
        assert!(matches!(reasons[0], RejectReason::Unparseable(_)));
        assert_eq!(reasons[1], &RejectReason::MissingDigest);
        assert_eq!(reasons.len(), 2);
        Ok(())
    }

    #[test]
    fn test_unsafe_and_oversized_members_are_rejected() -> TestResult {
        let fx = Fixture::new()?;
        let (entry, _) = profile_entry("ckbprofile0", "Work")?;
        let path = fx.path("hostile.ckb");
        let big = vec![b'x'; 4096];
        raw_zip(
            &path,
            &[
                ("../escape.ini", b"[x]\nName=evil\n".as_slice()),
                ("big.ini", big.as_slice()),
                ("ckbprofile0.ini", entry.content.as_slice()),
                ("ckbprofile0.ini.s256", entry.digest.to_file_contents().as_bytes()),
            ],
        )?;

        let reader = ArchiveReader::new(fx.scratch.clone(), IniProfileSerializer, 4095);
        let extracted = reader.read(&path)?;
        let reasons: Vec<&RejectReason> = extracted.rejected().iter().map(|r| &r.reason).collect();
        assert_eq!(reasons[0], &RejectReason::UnsafePath);
        assert!(matches!(reasons[1], RejectReason::TooLarge {
                size: 4096,
                limit: 4095
            }));
        assert_eq!(extracted.candidates().len(), 1);
        assert!(!fx.dir.path().join("escape.ini").exists());
        Ok(())
    }

    #[test]
    fn test_not_a_zip_is_fatal_and_leaves_no_scratch() -> TestResult {
        let fx = Fixture::new()?;
        let path = fx.path("garbage.ckb");
        fs::write(&path, b"definitely not a zip file")?;

        let result = fx.reader().read(&path);
        assert!(matches!(result, Err(ExchangeError::ArchiveRead { .. })));
        assert!(!fx.dir.path().join("scratch").exists() || fx.scratch_is_empty()?);
        Ok(())
    }

    #[test]
    fn test_empty_archive_is_fatal() -> TestResult {
        let fx = Fixture::new()?;
        let path = fx.path("empty.ckb");
        raw_zip(&path, &[])?;
        assert!(matches!(
            fx.reader().read(&path),
            Err(ExchangeError::ArchiveRead { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_fatal() -> TestResult {
        let fx = Fixture::new()?;
        assert!(matches!(
            fx.reader().read(&fx.path("nope.ckb")),
            Err(ExchangeError::ArchiveRead { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_encrypted_member_does_not_block_valid_pair() -> TestResult {
        let fx = Fixture::new()?;
        let (work, work_profile) = profile_entry("ckbprofile0", "Work")?;
        let path = fx.path("locked.ckb");

        let mut zip = ZipWriter::new(File::create(&path)?);
        zip.start_file("ckbprofile0.ini", SimpleFileOptions::default())?;
        zip.write_all(&work.content)?;
        zip.start_file("ckbprofile0.ini.s256", SimpleFileOptions::default())?;
        zip.write_all(work.digest.to_file_contents().as_bytes())?;
        zip.start_file(
            "readme.txt",
            SimpleFileOptions::default().with_aes_encryption(zip::AesMode::Aes256, "secret"),
        )?;
        zip.write_all(b"locked notes")?;
        zip.finish()?;

        let extracted = fx.reader().read(&path)?;
        assert_eq!(extracted.candidates().len(), 1);
        assert_eq!(extracted.candidates()[0].id(), work_profile.id());
        assert_eq!(extracted.rejected().len(), 1);
        assert_eq!(extracted.rejected()[0].member, "readme.txt");
        assert!(matches!(
            extracted.rejected()[0].reason,
            RejectReason::Unreadable(_)
        ));
        extracted.close()?;
        assert!(fx.scratch_is_empty()?);
        Ok(())
    }

    #[test]
    fn test_extract_failure_is_not_masked_by_cleanup_failure() -> TestResult {
        let fx = Fixture::new()?;
        let (work, _) = profile_entry("ckbprofile0", "Work")?;
        let path = fx.path("out.ckb");
        ArchiveWriter::new(fx.scratch.clone(), Some(6)).write(&path, &[work])?;

        let reader = ArchiveReader::new(
            Arc::new(FailingScratch::vanished(fx.dir.path())),
            IniProfileSerializer,
            1024 * 1024,
        );
        match reader.read(&path) {
            Err(ExchangeError::Io(_)) => Ok(()),
            other => Err(format!("expected the extraction IO error, got {other:?}").into()),
        }
    }
}
