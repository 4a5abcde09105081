//! Profile type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::{normalize_name, validate_field_key};
use crate::{ProfileError, ProfileResult};

/// Stable identifier of a profile across export and import.
///
/// Rendered in braced form (`{xxxxxxxx-xxxx-...}`), which is also the group
/// name of the profile's serialized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileId(Uuid);

impl ProfileId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from hyphenated, simple, braced or URN text.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::InvalidId`] if the text is not a GUID.
    pub fn parse(text: &str) -> ProfileResult<Self> {
        let trimmed = text.trim();
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|e| ProfileError::InvalidId(format!("{trimmed} ({e})")))
    }

    /// The nil identifier is never a valid profile id.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ProfileId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.braced())
    }
}

impl FromStr for ProfileId {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProfileId {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProfileId> for String {
    fn from(id: ProfileId) -> Self {
        id.to_string()
    }
}

/// A named, GUID-identified configuration set for the device.
///
/// Everything besides the id and the name is an opaque, ordered set of
/// key/value fields owned by the device layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    id: ProfileId,
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

impl Profile {
    /// Create an empty profile with a fresh id.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self::with_id(ProfileId::generate(), name)
    }

    /// Create an empty profile with a known id.
    pub fn with_id(id: ProfileId, name: impl AsRef<str>) -> Self {
        Self {
            id,
            name: normalize_name(name.as_ref()),
            fields: BTreeMap::new(),
        }
    }

    /// Build a profile from already-deserialized parts.
    ///
    /// # Errors
    ///
    /// Fails if any field key is empty or reserved.
    pub fn from_parts(
        id: ProfileId,
        name: impl AsRef<str>,
        fields: BTreeMap<String, String>,
    ) -> ProfileResult<Self> {
        for key in fields.keys() {
            validate_field_key(key)?;
        }
        Ok(Self {
            id,
            name: normalize_name(name.as_ref()),
            fields,
        })
    }

    pub fn id(&self) -> ProfileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Rename the profile. Names are trimmed and an empty name becomes
    /// [`crate::UNNAMED_PROFILE`].
    pub fn set_name(&mut self, name: impl AsRef<str>) {
        self.name = normalize_name(name.as_ref());
    }

    /// Set an opaque field, returning the previous value.
    ///
    /// # Errors
    ///
    /// Fails if `key` is empty or is the reserved name key.
    pub fn set_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ProfileResult<Option<String>> {
        let key = key.into();
        validate_field_key(&key)?;
        Ok(self.fields.insert(key, value.into()))
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn remove_field(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    /// Builder-style variant of [`Profile::set_field`].
    ///
    /// # Errors
    ///
    /// Same as [`Profile::set_field`].
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ProfileResult<Self> {
        self.set_field(key, value)?;
        Ok(self)
    }

    /// Copy of this profile under a new id.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ProfileId::generate(),
            name: self.name.clone(),
            fields: self.fields.clone(),
        }
    }

    /// Same content under a different id.
    pub fn reassigned(mut self, id: ProfileId) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_profile_id_display_is_braced() -> TestResult {
        let id = ProfileId::parse("0f8fad5b-d9cb-469f-a165-70867728950e")?;
        assert_eq!(id.to_string(), "{0f8fad5b-d9cb-469f-a165-70867728950e}");
        Ok(())
    }

    #[test]
    fn test_profile_id_parses_braced_and_padded() -> TestResult {
        let braced = ProfileId::parse(" {0F8FAD5B-D9CB-469F-A165-70867728950E} ")?;
        let plain = ProfileId::parse("0f8fad5b-d9cb-469f-a165-70867728950e")?;
        assert_eq!(braced, plain);
        Ok(())
    }

    #[test]
    fn test_profile_id_rejects_garbage() {
        assert!(matches!(
            ProfileId::parse("not-a-guid"),
            Err(ProfileError::InvalidId(_))
        ));
    }

    #[test]
    fn test_profile_id_serde_uses_braced_text() -> TestResult {
        let id = ProfileId::parse("0f8fad5b-d9cb-469f-a165-70867728950e")?;
        let json = serde_json::to_string(&id)?;
        assert_eq!(json, "\"{0f8fad5b-d9cb-469f-a165-70867728950e}\"");
        let back: ProfileId = serde_json::from_str(&json)?;
        assert_eq!(back, id);
        Ok(())
    }

    #[test]
    fn test_new_profile_normalizes_name() {
        let profile = Profile::new("  Work  ");
        assert_eq!(profile.name(), "Work");
        assert!(!profile.id().is_nil());

        let unnamed = Profile::new("   ");
        assert_eq!(unnamed.name(), crate::UNNAMED_PROFILE);
    }

    #[test]
    fn test_fields_reject_reserved_key() -> TestResult {
        let mut profile = Profile::new("Work");
        assert!(profile.set_field(crate::NAME_KEY, "x").is_err());
        assert!(profile.set_field("", "x").is_err());

        assert_eq!(profile.set_field("Mode0/Name", "Gaming")?, None);
        assert_eq!(
            profile.set_field("Mode0/Name", "Typing")?,
            Some("Gaming".to_string())
        );
        assert_eq!(profile.field("Mode0/Name"), Some("Typing"));
        Ok(())
    }

    #[test]
    fn test_duplicate_gets_new_id_and_same_content() -> TestResult {
        let profile = Profile::new("Home").with_field("Mode0/Light", "ff0000")?;
        let copy = profile.duplicate();
        assert_ne!(copy.id(), profile.id());
        assert_eq!(copy.name(), profile.name());
        assert_eq!(copy.fields(), profile.fields());
        Ok(())
    }
}
