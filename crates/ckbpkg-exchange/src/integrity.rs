//! SHA-256 integrity stamps for serialized profile documents
//!
//! Every document in an archive travels with a companion file holding the
//! lowercase hex SHA-256 of the document's exact bytes followed by a newline.
//! Verification recomputes the hash over the bytes as found and compares in
//! constant time; there is no fuzzy matching.

use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::Read;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::MalformedDigestError;

/// Size of a SHA-256 digest in bytes
pub const DIGEST_LEN: usize = 32;

/// Size of a hex-encoded digest in characters
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// Suffix appended to a document file name to name its digest file
pub const DIGEST_SUFFIX: &str = ".s256";

/// A SHA-256 value
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse hex text (either case). Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Fails on non-hex input or a value that is not 32 bytes long.
    pub fn from_hex(text: &str) -> Result<Self, MalformedDigestError> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| MalformedDigestError::InvalidHex(e.to_string()))?;
        let array: [u8; DIGEST_LEN] =
            bytes
                .try_into()
                .map_err(|rest: Vec<u8>| MalformedDigestError::WrongLength {
                    expected: DIGEST_LEN,
                    actual: rest.len(),
                })?;
        Ok(Self(array))
    }

    /// Contents of a digest companion file: hex plus a trailing newline
    pub fn to_file_contents(&self) -> String {
        format!("{}\n", self.to_hex())
    }

    /// Read a digest companion file, looking at no more than
    /// [`DIGEST_HEX_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Fails if the reader errors or the text is not a valid digest.
    pub fn read_from<R: Read>(reader: R) -> Result<Self, MalformedDigestError> {
        let mut buf = Vec::with_capacity(DIGEST_HEX_LEN);
        reader
            .take(DIGEST_HEX_LEN as u64)
            .read_to_end(&mut buf)
            .map_err(|e| MalformedDigestError::Unreadable(e.to_string()))?;
        let text = std::str::from_utf8(&buf)
            .map_err(|e| MalformedDigestError::InvalidHex(e.to_string()))?;
        Self::from_hex(text)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

/// Computes and checks document digests
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityStamper;

impl IntegrityStamper {
    /// SHA-256 over the exact bytes given
    pub fn digest(bytes: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Digest(hasher.finalize().into())
    }

    /// Recompute the digest of `bytes` and compare it with `expected`.
    pub fn verify(bytes: &[u8], expected: &Digest) -> bool {
        let actual = Self::digest(bytes);
        let matches: bool = actual.0.as_slice().ct_eq(expected.0.as_slice()).into();
        if !matches {
            warn!(%expected, %actual, "Digest verification failed");
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    // SHA-256 of the empty string
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_known_vector() {
        assert_eq!(IntegrityStamper::digest(b"").to_hex(), EMPTY_SHA256);
    }

    #[test]
    fn test_verify_detects_change() {
        let digest = IntegrityStamper::digest(b"[{guid}]\nName=Work\n");
        assert!(IntegrityStamper::verify(b"[{guid}]\nName=Work\n", &digest));
        assert!(!IntegrityStamper::verify(b"[{guid}]\nName=work\n", &digest));
    }

    #[test]
    fn test_file_contents_is_lowercase_hex_and_newline() {
        let contents = IntegrityStamper::digest(b"abc").to_file_contents();
        assert_eq!(contents.len(), DIGEST_HEX_LEN + 1);
        assert!(contents.ends_with('\n'));
        assert!(
            contents
                .trim_end()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_read_from_ignores_trailing_bytes() -> TestResult {
        let digest = IntegrityStamper::digest(b"abc");
        let text = format!("{}\ntrailing garbage", digest.to_hex());
        assert_eq!(Digest::read_from(text.as_bytes())?, digest);
        Ok(())
    }

    #[test]
    fn test_read_from_accepts_uppercase() -> TestResult {
        let digest = IntegrityStamper::digest(b"abc");
        let upper = digest.to_hex().to_uppercase();
        assert_eq!(Digest::read_from(upper.as_bytes())?, digest);
        Ok(())
    }

    #[test]
    fn test_truncated_digest_is_malformed() {
        let digest = IntegrityStamper::digest(b"abc").to_hex();
        let truncated = digest.get(..40).unwrap_or_default();
        assert!(matches!(
            Digest::read_from(truncated.as_bytes()),
            Err(MalformedDigestError::WrongLength {
                expected: DIGEST_LEN,
                actual: 20
            })
        ));
    }

    #[test]
    fn test_garbled_digest_is_malformed() {
        let garbled = "zz".repeat(DIGEST_LEN);
        assert!(matches!(
            Digest::read_from(garbled.as_bytes()),
            Err(MalformedDigestError::InvalidHex(_))
        ));
    }
}
