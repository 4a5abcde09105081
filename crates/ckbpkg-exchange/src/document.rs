//! Flat key/value profile documents
//!
//! A profile travels as a small INI-style text document with exactly one
//! group, named after the profile's GUID:
//!
//! ```text
//! [{0f8fad5b-d9cb-469f-a165-70867728950e}]
//! Name=Work
//! Mode0/Light/Color=ff0000
//! ```
//!
//! `Name` always comes first, the remaining keys follow in byte order, so a
//! given profile state always produces the same bytes. Backslash escapes keep
//! keys and values on one line: `\\`, `\n`, `\r` everywhere, plus `\=` and a
//! leading `\[`, `\;` or `\#` in keys.

use ckbpkg_profile::{NAME_KEY, Profile, ProfileId, validate_field_key};
use std::collections::BTreeMap;

use crate::error::SerializationError;

/// One profile as a group of key/value entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedDocument {
    group: String,
    entries: BTreeMap<String, String>,
}

impl SerializedDocument {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Render the document. Output is a pure function of the content.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push('[');
        out.push_str(&self.group);
        out.push_str("]\n");

        if let Some(name) = self.entries.get(NAME_KEY) {
            push_entry(&mut out, NAME_KEY, name);
        }
        for (key, value) in self.entries.iter().filter(|(k, _)| k.as_str() != NAME_KEY) {
            push_entry(&mut out, key, value);
        }
        out.into_bytes()
    }

    /// Parse a rendered document.
    ///
    /// Blank lines and lines starting with `;` or `#` are ignored; a trailing
    /// `\r` on a line is dropped.
    ///
    /// # Errors
    ///
    /// Fails on non-UTF-8 input, entries outside a group, a second group,
    /// lines without `=`, dangling escapes and repeated keys.
    pub fn parse(bytes: &[u8]) -> Result<Self, SerializationError> {
        let text =
            std::str::from_utf8(bytes).map_err(|e| SerializationError::Encoding(e.to_string()))?;

        let mut group: Option<String> = None;
        let mut entries = BTreeMap::new();

        for (index, raw) in text.split('\n').enumerate() {
            let line_no = index.saturating_add(1);
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            if line.trim().is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                if group.is_some() {
                    return Err(SerializationError::UnexpectedGroup(name.to_string()));
                }
                group = Some(name.to_string());
                continue;
            }

            if group.is_none() {
                return Err(SerializationError::MalformedLine {
                    line: line_no,
                    reason: "entry outside of a group".to_string(),
                });
            }

            let (key, value) = split_entry(line).ok_or_else(|| SerializationError::MalformedLine {
                line: line_no,
                reason: "expected key=value".to_string(),
            })?;

            if entries.contains_key(&key) {
                return Err(SerializationError::DuplicateKey(key));
            }
            entries.insert(key, value);
        }

        let group = group.ok_or(SerializationError::MissingGroup)?;
        Ok(Self { group, entries })
    }
}

/// Identity, name and opaque content extracted from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub id: ProfileId,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

impl ProfileFields {
    /// Build the profile under its own id.
    ///
    /// # Errors
    ///
    /// Fails if a field key is not acceptable as profile content.
    pub fn into_profile(self) -> Result<Profile, SerializationError> {
        let id = self.id;
        self.into_profile_with_id(id)
    }

    /// Build the profile under a different id.
    ///
    /// # Errors
    ///
    /// Fails if a field key is not acceptable as profile content.
    pub fn into_profile_with_id(self, id: ProfileId) -> Result<Profile, SerializationError> {
        Profile::from_parts(id, &self.name, self.fields)
            .map_err(|e| SerializationError::InvalidField(e.to_string()))
    }
}

/// Converts profiles to documents and back.
///
/// Implementations must be deterministic: the same profile state always
/// yields an identical document.
pub trait ProfileSerializer {
    fn serialize(&self, profile: &Profile) -> SerializedDocument;

    /// # Errors
    ///
    /// Fails with [`SerializationError`] if the GUID group or the name is
    /// missing, or the content cannot form a profile.
    fn deserialize(&self, document: &SerializedDocument) -> Result<ProfileFields, SerializationError>;
}

/// The `.ini` layout used inside `.ckb` archives
#[derive(Debug, Clone, Copy, Default)]
pub struct IniProfileSerializer;

impl ProfileSerializer for IniProfileSerializer {
    fn serialize(&self, profile: &Profile) -> SerializedDocument {
        let mut document = SerializedDocument::new(profile.id().to_string());
        document.insert(NAME_KEY, profile.name());
        for (key, value) in profile.fields() {
            document.insert(key.as_str(), value.as_str());
        }
        document
    }

    fn deserialize(&self, document: &SerializedDocument) -> Result<ProfileFields, SerializationError> {
        let id = ProfileId::parse(document.group())
            .map_err(|e| SerializationError::InvalidGuid(e.to_string()))?;

        let name = document
            .get(NAME_KEY)
            .ok_or_else(|| SerializationError::MissingField(NAME_KEY.to_string()))?
            .to_string();

        let mut fields = BTreeMap::new();
        for (key, value) in document.entries() {
            if key == NAME_KEY {
                continue;
            }
            validate_field_key(key).map_err(|e| SerializationError::InvalidField(e.to_string()))?;
            fields.insert(key.clone(), value.clone());
        }

        Ok(ProfileFields { id, name, fields })
    }
}

fn push_entry(out: &mut String, key: &str, value: &str) {
    for (index, c) in key.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '=' => out.push_str("\\="),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '[' | ';' | '#' if index == 0 => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('=');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\n');
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut chars = line.chars();
    loop {
        match chars.next()? {
            '\\' => key.push(unescape(chars.next()?)),
            '=' => break,
            c => key.push(c),
        }
    }

    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            value.push(unescape(chars.next()?));
        } else {
            value.push(c);
        }
    }
    Some((key, value))
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const GUID: &str = "{0f8fad5b-d9cb-469f-a165-70867728950e}";

    fn sample() -> Result<Profile, Box<dyn std::error::Error>> {
        let id = ProfileId::parse(GUID)?;
        Ok(Profile::with_id(id, "Work")
            .with_field("Mode0/Name", "Typing")?
            .with_field("HwModeCount", "1")?)
    }

    #[test]
    fn test_serialize_layout() -> TestResult {
        let document = IniProfileSerializer.serialize(&sample()?);
        let text = String::from_utf8(document.to_bytes())?;
        assert_eq!(
            text,
            format!("[{GUID}]\nName=Work\nHwModeCount=1\nMode0/Name=Typing\n")
        );
        Ok(())
    }

    #[test]
    fn test_serialize_is_deterministic() -> TestResult {
        let profile = sample()?;
        let a = IniProfileSerializer.serialize(&profile).to_bytes();
        let b = IniProfileSerializer.serialize(&profile.clone()).to_bytes();
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_round_trip_with_awkward_text() -> TestResult {
        let id = ProfileId::generate();
        let profile = Profile::with_id(id, "Über = \\ Profile")
            .with_field("[odd", "multi\nline\r\nvalue")?
            .with_field("a=b", "=leading equals")?
            .with_field(";comment-like", "#hash")?
            .with_field("trailing\\", "\\")?;

        let bytes = IniProfileSerializer.serialize(&profile).to_bytes();
        let parsed = SerializedDocument::parse(&bytes)?;
        let restored = IniProfileSerializer.deserialize(&parsed)?.into_profile()?;
        assert_eq!(restored, profile);
        Ok(())
    }

    #[test]
    fn test_parse_tolerates_crlf_comments_and_blank_lines() -> TestResult {
        let text = format!("; exported\r\n\r\n[{GUID}]\r\nName=Home\r\n# note\r\nk=v\r\n");
        let document = SerializedDocument::parse(text.as_bytes())?;
        assert_eq!(document.group(), GUID);
        assert_eq!(document.get("Name"), Some("Home"));
        assert_eq!(document.get("k"), Some("v"));
        Ok(())
    }

    #[test]
    fn test_missing_name_is_serialization_error() -> TestResult {
        let text = format!("[{GUID}]\nk=v\n");
        let document = SerializedDocument::parse(text.as_bytes())?;
        assert_eq!(
            IniProfileSerializer.deserialize(&document),
            Err(SerializationError::MissingField("Name".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_group_must_be_guid() -> TestResult {
        let document = SerializedDocument::parse(b"[General]\nName=Work\n")?;
        assert!(matches!(
            IniProfileSerializer.deserialize(&document),
            Err(SerializationError::InvalidGuid(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            SerializedDocument::parse(b""),
            Err(SerializationError::MissingGroup)
        );
        assert!(matches!(
            SerializedDocument::parse(b"Name=Work\n"),
            Err(SerializationError::MalformedLine { line: 1, .. })
        ));
        assert!(matches!(
            SerializedDocument::parse(b"[a]\nName=Work\n[b]\n"),
            Err(SerializationError::UnexpectedGroup(_))
        ));
        assert!(matches!(
            SerializedDocument::parse(b"[a]\nno equals sign\n"),
            Err(SerializationError::MalformedLine { line: 2, .. })
        ));
        assert!(matches!(
            SerializedDocument::parse(b"[a]\nk=v\nk=w\n"),
            Err(SerializationError::DuplicateKey(_))
        ));
        assert!(matches!(
            SerializedDocument::parse(b"[a]\nk=dangling\\"),
            Err(SerializationError::MalformedLine { .. })
        ));
        assert!(matches!(
            SerializedDocument::parse(&[0xff, 0xfe]),
            Err(SerializationError::Encoding(_))
        ));
    }
}
