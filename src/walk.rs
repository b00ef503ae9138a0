//! Recursive directory traversal with explicit per-entry decisions.
//!
//! Every visited entry is handed to a [`Visitor`] as a tagged [`WalkEntry`].
//! The visitor answers with a [`Decision`]: skip the entry, process it, or
//! abort the whole walk. Entries are yielded in file-name order so that runs
//! over the same tree visit files in the same sequence.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::{DirEntry, WalkDir};

/// One visited filesystem entry.
#[derive(Debug)]
pub enum WalkEntry {
    /// A directory, the root included. Descent continues regardless of the
    /// decision taken for it.
    Directory(PathBuf),
    /// A regular file together with its metadata. A symlink that does not
    /// point at a directory is reported as a regular file under its own path.
    RegularFile { path: PathBuf, metadata: Metadata },
    /// The underlying walk could not read an entry.
    Error(walkdir::Error),
}

impl WalkEntry {
    /// Path of the entry, when known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            WalkEntry::Directory(path) | WalkEntry::RegularFile { path, .. } => Some(path.as_path()),
            WalkEntry::Error(err) => err.path(),
        }
    }
}

/// What the walk does with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Ignore the entry and keep walking.
    Skip,
    /// Hand a regular file to [`Visitor::process`].
    Process,
    /// Stop the walk and report the entry to the caller.
    Abort,
}

/// Why a walk ended early.
#[derive(Debug)]
pub enum Stop<E> {
    /// The visitor answered [`Decision::Abort`] for this entry.
    Aborted(WalkEntry),
    /// [`Visitor::process`] failed.
    Failed(E),
}

/// Caller-side policy for a walk.
pub trait Visitor {
    type Error;

    /// Classifies an entry. Only [`WalkEntry::RegularFile`] entries can be
    /// processed; `Process` on any other entry is treated as `Skip`.
    fn decide(&mut self, entry: &WalkEntry) -> Decision;

    /// Handles a regular file the visitor asked to process.
    fn process(&mut self, path: &Path, metadata: &Metadata) -> Result<(), Self::Error>;
}

/// Walks `root` recursively, feeding every entry to `visitor`.
///
/// Symlinked directories are not descended into. A symlink to a file is
/// yielded with the target's metadata; a dangling symlink keeps its own, so
/// opening it is what fails. Sockets, pipes and devices are passed over
/// without consulting the visitor.
pub fn walk<V: Visitor>(root: &Path, visitor: &mut V) -> Result<(), Stop<V::Error>> {
    for item in WalkDir::new(root).sort_by_file_name() {
        let entry = match item {
            Ok(dir_entry) => match classify_entry(dir_entry) {
                Some(entry) => entry,
                None => continue,
            },
            Err(err) => WalkEntry::Error(err),
        };

        match visitor.decide(&entry) {
            Decision::Skip => {}
            Decision::Abort => return Err(Stop::Aborted(entry)),
            Decision::Process => {
                if let WalkEntry::RegularFile { path, metadata } = &entry {
                    visitor.process(path, metadata).map_err(Stop::Failed)?;
                }
            }
        }
    }

    Ok(())
}

fn classify_entry(dir_entry: DirEntry) -> Option<WalkEntry> {
    let file_type = dir_entry.file_type();
    if file_type.is_dir() {
        return Some(WalkEntry::Directory(dir_entry.into_path()));
    }

    if file_type.is_symlink() {
        return match fs::metadata(dir_entry.path()) {
            Ok(target) if target.is_dir() => {
                trace!(path = %dir_entry.path().display(), "symlinked directory, not following");
                None
            }
            Ok(target) if target.is_file() => Some(WalkEntry::RegularFile {
                path: dir_entry.into_path(),
                metadata: target,
            }),
            Ok(_) => {
                trace!(path = %dir_entry.path().display(), "symlink to a special file, passing over");
                None
            }
            Err(_) => Some(regular_file(dir_entry)),
        };
    }

    if file_type.is_file() {
        return Some(regular_file(dir_entry));
    }

    trace!(path = %dir_entry.path().display(), "not a regular file, passing over");
    None
}

fn regular_file(dir_entry: DirEntry) -> WalkEntry {
    match dir_entry.metadata() {
        Ok(metadata) => WalkEntry::RegularFile {
            path: dir_entry.into_path(),
            metadata,
        },
        Err(err) => WalkEntry::Error(err),
    }
}
