//! Destination planning for timeline files.
//!
//! A placement is a pure function of the file's name, modification time and
//! content hash: the bucket directory comes from the date alone and the file
//! name from `(base, hash, extension)` alone. Two files that agree on base
//! name, extension and hash prefix get the same destination; the later copy
//! overwrites the earlier one.

use crate::filter::extension_of;
use crate::hasher::ContentHash;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// `chrono` format of bucket directory names, e.g. `2024_03_09`.
pub const BUCKET_FORMAT: &str = "%Y_%m_%d";

/// Where a source file lands inside the output root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placement {
    /// First-level directory named after the modification date.
    pub bucket: String,
    /// `{base}_{hash6}{ext}`.
    pub file_name: String,
}

impl Placement {
    /// Full destination path below `output_root`.
    pub fn destination(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.bucket).join(&self.file_name)
    }
}

/// Splits a file name into base and extension, the extension keeping its dot.
///
/// # Examples
///
/// ```
/// use timeline::placement::split_file_name;
///
/// assert_eq!(split_file_name("IMG_0001.jpg"), ("IMG_0001", ".jpg"));
/// assert_eq!(split_file_name("notes"), ("notes", ""));
/// ```
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    let ext = extension_of(file_name);
    (&file_name[..file_name.len() - ext.len()], ext)
}

/// Renders a modification time as a bucket name in the local timezone.
pub fn bucket_for(modified: SystemTime) -> String {
    DateTime::<Local>::from(modified)
        .format(BUCKET_FORMAT)
        .to_string()
}

/// Computes the placement of one file.
///
/// # Examples
///
/// ```
/// use timeline::hasher::hash_reader;
/// use timeline::placement::{bucket_for, plan};
/// use std::time::SystemTime;
///
/// let now = SystemTime::now();
/// let hash = hash_reader(&b"abc"[..]).unwrap();
/// let placement = plan("beach", ".jpg", now, &hash);
/// assert_eq!(placement.file_name, "beach_ba7816.jpg");
/// assert_eq!(placement.bucket, bucket_for(now));
/// ```
pub fn plan(base: &str, extension: &str, modified: SystemTime, hash: &ContentHash) -> Placement {
    Placement {
        bucket: bucket_for(modified),
        file_name: format!("{}_{}{}", base, hash.short(), extension),
    }
}
