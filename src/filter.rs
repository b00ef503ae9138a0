//! Source file selection.
//!
//! Two independent predicates decide whether a visited file is ingested:
//! - the exclusion filter, a blunt substring test over the whole path
//! - the extension allow-list, an exact case-sensitive membership test
//!
//! Neither predicate touches the filesystem.

use std::collections::HashSet;
use std::path::Path;

/// Substring identifying the Windows recycle bin anywhere in a path.
pub const RECYCLE_BIN_MARKER: &str = "$Recycle.Bin";

/// Character reserved for hidden/system artifacts. Any path containing it is
/// skipped, including legitimate names such as `price$list.jpg`.
pub const RESERVED_MARKER: char = '$';

/// Returns true when `path` must be skipped regardless of its extension.
///
/// The test runs on the full path string, not on individual components, so a
/// marker in any parent directory excludes every file below it.
///
/// # Examples
///
/// ```
/// use timeline::filter::is_excluded;
/// use std::path::Path;
///
/// assert!(is_excluded(Path::new("C:/$Recycle.Bin/S-1-5/photo.jpg")));
/// assert!(is_excluded(Path::new("/data/$tmp/photo.jpg")));
/// assert!(!is_excluded(Path::new("/data/photos/photo.jpg")));
/// ```
pub fn is_excluded(path: &Path) -> bool {
    let path = path.to_string_lossy();
    path.contains(RECYCLE_BIN_MARKER) || path.contains(RESERVED_MARKER)
}

/// Returns the extension of a file name, leading dot included.
///
/// The extension is everything from the last `.` of the name onwards, so
/// `archive.tar.gz` yields `.gz` and `.profile` yields `.profile`. A name
/// without a dot has an empty extension.
pub fn extension_of(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) => &file_name[idx..],
        None => "",
    }
}

/// Allow-list of file extensions, each stored with its leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: HashSet<String>,
}

impl ExtensionSet {
    /// Builds a set from extension strings such as `".jpg"`.
    ///
    /// Empty strings are ignored: a file without an extension is never
    /// selected.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(Into::into)
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// Returns true iff the extension of the final component of `path` is in
    /// the set. Matching is case-sensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use timeline::filter::ExtensionSet;
    /// use std::path::Path;
    ///
    /// let set = ExtensionSet::new([".jpg", ".mp4"]);
    /// assert!(set.matches(Path::new("/photos/beach.jpg")));
    /// assert!(!set.matches(Path::new("/photos/beach.JPG")));
    /// assert!(!set.matches(Path::new("/photos/notes.txt")));
    /// ```
    pub fn matches(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name() else {
            return false;
        };
        let file_name = file_name.to_string_lossy();
        let ext = extension_of(&file_name);
        !ext.is_empty() && self.extensions.contains(ext)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}
