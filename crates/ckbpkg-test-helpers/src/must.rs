//! Unwrap helpers with good error messages.
//!
//! These helpers replace `unwrap()` and `expect()` in test code, providing
//! better error messages with `#[track_caller]` for accurate panic locations.
//!
//! # When to use
//!
//! - Use `must` when you have a `Result` that should succeed in tests
//! - Use `must_with` to add context to that failure
//! - Use `must_some` when you have an `Option` that should be `Some`
//! - Use `must_parse` when parsing strings (GUIDs, numbers) that should parse

use std::fmt::Debug;
use std::str::FromStr;

/// Unwrap a `Result`, panicking with context on error.
///
/// # Example
///
/// ```rust
/// use ckbpkg_test_helpers::must;
///
/// let result: Result<i32, &str> = Ok(42);
/// assert_eq!(must(result), 42);
/// ```
///
/// # Panics
///
/// Panics if the result is `Err`, with a message including the error value.
#[track_caller]
pub fn must<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must: unexpected Err: {e:?}"),
    }
}

/// Unwrap a `Result`, naming what was being attempted on error.
///
/// # Panics
///
/// Panics if the result is `Err`.
#[track_caller]
pub fn must_with<T, E: Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must_with: {context}: {e:?}"),
    }
}

/// Unwrap an `Option`, panicking with a custom message if `None`.
///
/// ```rust
/// use ckbpkg_test_helpers::must_some;
///
/// assert_eq!(must_some(Some(42), "expected a value"), 42);
/// ```
///
/// # Panics
///
/// Panics if the option is `None`, with the provided message.
#[track_caller]
pub fn must_some<T>(option: Option<T>, msg: &str) -> T {
    match option {
        Some(v) => v,
        None => panic!("must_some: {msg}"),
    }
}

/// Parse a string into a type, panicking on failure.
///
/// ```rust
/// use ckbpkg_test_helpers::must_parse;
///
/// let value: u64 = must_parse("42");
/// assert_eq!(value, 42);
/// ```
///
/// # Panics
///
/// Panics if parsing fails.
#[track_caller]
pub fn must_parse<T: FromStr>(s: &str) -> T
where
    T::Err: Debug,
{
    match s.parse() {
        Ok(v) => v,
        Err(e) => panic!("must_parse: failed to parse {s:?}: {e:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_must_ok() {
        let r: Result<u8, String> = Ok(7);
        assert_eq!(must(r), 7);
    }

    #[test]
    #[should_panic(expected = "must: unexpected Err")]
    fn test_must_err_panics() {
        let r: Result<u8, String> = Err("boom".to_string());
        must(r);
    }

    #[test]
    #[should_panic(expected = "must_with: opening archive")]
    fn test_must_with_names_context() {
        let r: Result<u8, &str> = Err("missing");
        must_with(r, "opening archive");
    }

    #[test]
    #[should_panic(expected = "must_some: nothing here")]
    fn test_must_some_none_panics() {
        must_some(None::<u8>, "nothing here");
    }

    #[test]
    fn test_must_parse() {
        let v: i64 = must_parse("-3");
        assert_eq!(v, -3);
    }
}
