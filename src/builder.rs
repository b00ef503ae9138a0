//! Timeline construction: copy selected source files into date buckets.
//!
//! Each source root is walked recursively. Regular files pass the exclusion
//! filter and then the extension allow-list; survivors are hashed, planned,
//! and copied to `<output_root>/<YYYY_MM_DD>/<base>_<hash6><ext>`. Source
//! files are only ever read. Files already below the output root are never
//! picked up again, so the timeline may live inside a source folder.

use crate::config::FailurePolicy;
use crate::filter::{ExtensionSet, is_excluded};
use crate::hasher::hash_reader;
use crate::placement::{Placement, plan, split_file_name};
use crate::walk::{self, Decision, Stop, Visitor, WalkEntry};
use std::collections::HashSet;
use std::fs::{self, File, Metadata};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that end a build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The directory walk under a source root could not continue.
    #[error("cannot walk {}: {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Opening, hashing or copying a file failed.
    #[error("cannot {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A bucket directory could not be created.
    #[error("cannot create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// One source file and where it went (or would go, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub placement: Placement,
}

/// Tallies for a build run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Directories visited, source roots included.
    pub directories: usize,
    /// Files copied (or, in a dry run, planned).
    pub placed: usize,
    /// Planned placements in processing order. Only filled in a dry run.
    pub planned: Vec<PlacedFile>,
    /// Files skipped by the exclusion filter.
    pub excluded: usize,
    /// Files skipped because they already sit below the output root.
    pub in_output: usize,
    /// Files skipped because their extension is not allowed.
    pub unmatched: usize,
    /// Copies that replaced a file written earlier in the same run.
    pub overwritten: usize,
    /// Files that could not be copied under [`FailurePolicy::SkipFile`].
    pub failed: Vec<(PathBuf, String)>,
    written: HashSet<PathBuf>,
}

impl BuildReport {
    /// Number of distinct destination files produced by the run.
    pub fn distinct_destinations(&self) -> usize {
        self.written.len()
    }

    fn record(&mut self, placed: PlacedFile, keep: bool) {
        self.placed += 1;
        if !self.written.insert(placed.destination.clone()) {
            warn!(
                source = %placed.source.display(),
                destination = %placed.destination.display(),
                "destination already written in this run, overwriting"
            );
            self.overwritten += 1;
        }
        if keep {
            self.planned.push(placed);
        }
    }
}

/// Copies files from source roots into a timeline tree.
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    output_root: PathBuf,
    extensions: ExtensionSet,
    failure_policy: FailurePolicy,
    dry_run: bool,
}

impl TimelineBuilder {
    /// Creates a builder writing below `output_root` and selecting files by
    /// `extensions`. Failures abort the run and files are really copied.
    pub fn new(output_root: impl Into<PathBuf>, extensions: ExtensionSet) -> Self {
        Self {
            output_root: output_root.into(),
            extensions,
            failure_policy: FailurePolicy::Abort,
            dry_run: false,
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// In a dry run files are hashed and planned but nothing is written.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Processes every root in order and returns the combined report.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use timeline::builder::TimelineBuilder;
    /// use timeline::filter::ExtensionSet;
    /// use std::path::PathBuf;
    ///
    /// let builder = TimelineBuilder::new("/srv/timeline", ExtensionSet::new([".jpg"]));
    /// let report = builder.build(&[PathBuf::from("/home/me/Pictures")])?;
    /// println!("copied {} files", report.placed);
    /// # Ok::<(), timeline::builder::BuildError>(())
    /// ```
    pub fn build(&self, roots: &[PathBuf]) -> BuildResult<BuildReport> {
        let mut report = BuildReport::default();
        for root in roots {
            self.build_root(root, &mut report)?;
        }
        Ok(report)
    }

    /// Walks one source root, adding its results to `report`.
    ///
    /// A traversal error ends the walk of this root and is returned; with
    /// [`FailurePolicy::Abort`] so is the first file that cannot be copied.
    pub fn build_root(&self, root: &Path, report: &mut BuildReport) -> BuildResult<()> {
        info!(root = %root.display(), "processing source folder");

        let mut visitor = RootVisitor {
            builder: self,
            report,
        };
        walk::walk(root, &mut visitor).map_err(|stop| match stop {
            Stop::Failed(err) => err,
            Stop::Aborted(WalkEntry::Error(err)) => BuildError::Traversal {
                path: err.path().unwrap_or(root).to_path_buf(),
                source: err.into(),
            },
            Stop::Aborted(entry) => BuildError::Traversal {
                path: entry.path().unwrap_or(root).to_path_buf(),
                source: io::Error::other("walk aborted"),
            },
        })
    }

    /// Hashes, plans and copies a single file.
    ///
    /// The bucket directory is created on demand; an existing directory is
    /// fine. An existing destination file is truncated and rewritten.
    pub fn place_file(&self, path: &Path, metadata: &Metadata) -> BuildResult<PlacedFile> {
        let io_error = move |action: &'static str| {
            move |source: io::Error| BuildError::Io {
                action,
                path: path.to_path_buf(),
                source,
            }
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .ok_or_else(|| {
                io_error("name")(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "file has no name component",
                ))
            })?;
        let (base, extension) = split_file_name(&file_name);
        let modified = metadata
            .modified()
            .map_err(io_error("read modification time of"))?;

        let mut reader = File::open(path).map_err(io_error("open"))?;
        let hash = hash_reader(&mut reader).map_err(io_error("hash"))?;
        debug!(path = %path.display(), %hash, "hashed");

        let placement = plan(base, extension, modified, &hash);
        let destination = placement.destination(&self.output_root);

        if self.dry_run {
            debug!(
                source = %path.display(),
                destination = %destination.display(),
                "dry run, not copying"
            );
        } else {
            let bucket_dir = self.output_root.join(&placement.bucket);
            fs::create_dir_all(&bucket_dir).map_err(|source| BuildError::DirectoryCreation {
                path: bucket_dir.clone(),
                source,
            })?;

            reader
                .seek(SeekFrom::Start(0))
                .map_err(io_error("rewind"))?;
            let mut target = File::create(&destination).map_err(|source| BuildError::Io {
                action: "create",
                path: destination.clone(),
                source,
            })?;
            io::copy(&mut reader, &mut target).map_err(io_error("copy"))?;

            info!(
                source = %path.display(),
                destination = %destination.display(),
                "copied"
            );
        }

        Ok(PlacedFile {
            source: path.to_path_buf(),
            destination,
            placement,
        })
    }
}

/// Walk policy for one source root.
struct RootVisitor<'a> {
    builder: &'a TimelineBuilder,
    report: &'a mut BuildReport,
}

impl Visitor for RootVisitor<'_> {
    type Error = BuildError;

    fn decide(&mut self, entry: &WalkEntry) -> Decision {
        match entry {
            WalkEntry::Directory(path) => {
                debug!(path = %path.display(), "processing folder");
                self.report.directories += 1;
                Decision::Skip
            }
            WalkEntry::Error(_) => Decision::Abort,
            WalkEntry::RegularFile { path, .. } => {
                if is_excluded(path) {
                    debug!(path = %path.display(), "excluded");
                    self.report.excluded += 1;
                    Decision::Skip
                } else if path.starts_with(&self.builder.output_root) {
                    debug!(path = %path.display(), "already in the timeline");
                    self.report.in_output += 1;
                    Decision::Skip
                } else if !self.builder.extensions.matches(path) {
                    self.report.unmatched += 1;
                    Decision::Skip
                } else {
                    Decision::Process
                }
            }
        }
    }

    fn process(&mut self, path: &Path, metadata: &Metadata) -> BuildResult<()> {
        match self.builder.place_file(path, metadata) {
            Ok(placed) => {
                self.report.record(placed, self.builder.dry_run);
                Ok(())
            }
            Err(err) if self.builder.failure_policy == FailurePolicy::SkipFile => {
                warn!(path = %path.display(), error = %err, "skipping file");
                self.report.failed.push((path.to_path_buf(), err.to_string()));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
