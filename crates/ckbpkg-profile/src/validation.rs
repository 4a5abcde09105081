//! Profile validation

use crate::{NAME_KEY, ProfileError, ProfileResult, UNNAMED_PROFILE};

/// Trim a display name, substituting [`UNNAMED_PROFILE`] for an empty one.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNNAMED_PROFILE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Check that `key` may be used as an opaque profile field.
///
/// # Errors
///
/// Returns [`ProfileError::ReservedField`] for the name key and
/// [`ProfileError::InvalidFieldKey`] for empty keys or keys containing
/// line breaks.
pub fn validate_field_key(key: &str) -> ProfileResult<()> {
    if key.is_empty() {
        return Err(ProfileError::InvalidFieldKey(
            "field key cannot be empty".to_string(),
        ));
    }

    if key.contains(['\n', '\r']) {
        return Err(ProfileError::InvalidFieldKey(format!(
            "field key {key:?} contains a line break"
        )));
    }

    if key == NAME_KEY {
        return Err(ProfileError::ReservedField(key.to_string()));
    }

    Ok(())
}
