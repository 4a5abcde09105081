//! Filesystem assertions for export/import tests.

/// Assert that a directory exists and holds no entries.
///
/// A missing directory also passes: nothing was left behind in it.
///
/// ```rust
/// use ckbpkg_test_helpers::assert_dir_empty;
///
/// let dir = std::env::temp_dir().join("ckbpkg-test-helpers-doc-missing");
/// assert_dir_empty!(&dir);
/// ```
#[macro_export]
macro_rules! assert_dir_empty {
    ($dir:expr $(,)?) => {
        let dir_arg = $dir;
        let dir: &::std::path::Path = ::std::convert::AsRef::as_ref(&dir_arg);
        let leftovers = $crate::assertions::dir_entries(dir);
        if !leftovers.is_empty() {
            panic!(
                "assertion failed: `{}` is not empty\n  leftovers: {:?}",
                dir.display(),
                leftovers
            );
        }
    };
}

/// Assert that a zip file holds exactly the named members, in order.
#[cfg(feature = "fixtures")]
#[macro_export]
macro_rules! assert_archive_members {
    ($path:expr, [$($member:expr),* $(,)?] $(,)?) => {
        let path_arg = $path;
        let path: &::std::path::Path = ::std::convert::AsRef::as_ref(&path_arg);
        let actual = $crate::assertions::archive_members(path);
        let expected: Vec<String> = vec![$(String::from($member)),*];
        if actual != expected {
            panic!(
                "assertion failed: archive members differ\n  archive: `{}`\n   actual: {:?}\n expected: {:?}",
                path.display(),
                actual,
                expected
            );
        }
    };
}

/// Names of everything directly inside `dir`, sorted. Empty if `dir` is missing.
///
/// # Panics
///
/// Panics if `dir` exists but cannot be listed.
pub fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => panic!("cannot list {}: {e}", dir.display()),
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Member names of a zip file in central directory order.
///
/// # Panics
///
/// Panics if the file is not a readable zip.
#[cfg(feature = "fixtures")]
pub fn archive_members(path: &std::path::Path) -> Vec<String> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => panic!("cannot open {}: {e}", path.display()),
    };
    let mut archive = match zip::ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(e) => panic!("{} is not a zip archive: {e}", path.display()),
    };
    (0..archive.len())
        .map(|i| match archive.by_index(i) {
            Ok(entry) => entry.name().to_string(),
            Err(e) => panic!("cannot read member {i} of {}: {e}", path.display()),
        })
        .collect()
}
