//! Timeline counting.
//!
//! Walks a timeline tree, counts files per bucket (the name of each file's
//! parent directory) and per file type (the extension without its dot), and
//! writes the counts as a `;`-delimited report at the root of the tree.
//!
//! Report rows are ordered by bucket descending, so the newest dates come
//! first, then by file type ascending:
//!
//! ```text
//! Folder;File Type;Count
//! 2024_01_02;txt;1
//! 2024_01_01;jpg;2
//! ```

use crate::filter::extension_of;
use crate::walk::{self, Decision, Stop, Visitor, WalkEntry};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs::Metadata;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Header row of the report.
pub const REPORT_HEADER: [&str; 3] = ["Folder", "File Type", "Count"];

/// Errors that end a count.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The timeline tree could not be walked.
    #[error("cannot walk {}: {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The report file could not be created or written.
    #[error("cannot write report {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Result type for count operations.
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Number of files of one type in one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub bucket: String,
    pub file_type: String,
    pub count: u64,
}

impl CountEntry {
    pub fn new(bucket: impl Into<String>, file_type: impl Into<String>, count: u64) -> Self {
        Self {
            bucket: bucket.into(),
            file_type: file_type.into(),
            count,
        }
    }
}

/// Report order: bucket descending, then file type ascending.
///
/// # Examples
///
/// ```
/// use timeline::aggregator::{CountEntry, compare_entries};
/// use std::cmp::Ordering;
///
/// let newer = CountEntry::new("2024_01_02", "txt", 1);
/// let older = CountEntry::new("2024_01_01", "jpg", 2);
/// assert_eq!(compare_entries(&newer, &older), Ordering::Less);
/// ```
pub fn compare_entries(a: &CountEntry, b: &CountEntry) -> Ordering {
    b.bucket
        .cmp(&a.bucket)
        .then_with(|| a.file_type.cmp(&b.file_type))
}

/// Bucket and file type of a file in the timeline tree.
///
/// The bucket is the name of the immediate parent directory, whatever it is
/// called; the type is the extension with its dot stripped and its case kept.
pub fn classify(path: &Path) -> (String, String) {
    let bucket = path
        .parent()
        .map(|parent| match parent.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => parent.to_string_lossy().into_owned(),
        })
        .unwrap_or_default();

    let file_type = path
        .file_name()
        .map(|name| {
            let name = name.to_string_lossy();
            extension_of(&name).trim_start_matches('.').to_string()
        })
        .unwrap_or_default();

    (bucket, file_type)
}

/// Per-bucket, per-type file counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountAccumulator {
    counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl CountAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one file of `file_type` to `bucket`.
    pub fn add(&mut self, bucket: &str, file_type: &str) {
        *self
            .counts
            .entry(bucket.to_string())
            .or_default()
            .entry(file_type.to_string())
            .or_insert(0) += 1;
    }

    /// Classifies `path` and counts it.
    pub fn add_path(&mut self, path: &Path) {
        let (bucket, file_type) = classify(path);
        self.add(&bucket, &file_type);
    }

    /// Total number of files counted.
    pub fn total(&self) -> u64 {
        self.counts.values().flat_map(|types| types.values()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Flattens the counts into report order.
    pub fn into_sorted_entries(self) -> Vec<CountEntry> {
        let mut entries: Vec<CountEntry> = self
            .counts
            .into_iter()
            .flat_map(|(bucket, types)| {
                types
                    .into_iter()
                    .map(move |(file_type, count)| CountEntry::new(bucket.clone(), file_type, count))
            })
            .collect();
        entries.sort_by(compare_entries);
        entries
    }
}

/// Writes the header and `entries`, in the given order, as `;`-delimited rows.
pub fn write_entries<W: Write>(writer: W, entries: &[CountEntry]) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    writer.write_record(REPORT_HEADER)?;
    for entry in entries {
        writer.write_record([
            entry.bucket.as_str(),
            entry.file_type.as_str(),
            &entry.count.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Counts a timeline tree and writes its report.
#[derive(Debug, Clone)]
pub struct TimelineAggregator {
    output_root: PathBuf,
    report_file_name: String,
}

impl TimelineAggregator {
    pub fn new(output_root: impl Into<PathBuf>, report_file_name: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            report_file_name: report_file_name.into(),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_root.join(&self.report_file_name)
    }

    /// Walks the tree and returns the counts in report order.
    ///
    /// Files named like the report are not counted, wherever they are.
    pub fn count(&self) -> AggregateResult<Vec<CountEntry>> {
        info!(root = %self.output_root.display(), "counting timeline");

        let mut visitor = CountVisitor {
            report_file_name: &self.report_file_name,
            counts: CountAccumulator::new(),
        };
        if let Err(stop) = walk::walk(&self.output_root, &mut visitor) {
            let (path, source) = match stop {
                Stop::Aborted(WalkEntry::Error(err)) => (
                    err.path().unwrap_or(&self.output_root).to_path_buf(),
                    io::Error::from(err),
                ),
                Stop::Aborted(entry) => (
                    entry.path().unwrap_or(&self.output_root).to_path_buf(),
                    io::Error::other("walk aborted"),
                ),
                Stop::Failed(never) => match never {},
            };
            return Err(AggregateError::Traversal { path, source });
        }

        Ok(visitor.counts.into_sorted_entries())
    }

    /// Writes `entries` to the report file, replacing any previous report.
    pub fn write_report(&self, entries: &[CountEntry]) -> AggregateResult<PathBuf> {
        let path = self.report_path();
        let report_error = |source: csv::Error| AggregateError::ReportWrite {
            path: path.clone(),
            source,
        };

        let file = std::fs::File::create(&path).map_err(|e| report_error(e.into()))?;
        write_entries(io::BufWriter::new(file), entries).map_err(report_error)?;

        info!(report = %path.display(), rows = entries.len(), "report written");
        Ok(path)
    }

    /// Counts the tree and writes the report.
    pub fn run(&self) -> AggregateResult<Vec<CountEntry>> {
        let entries = self.count()?;
        self.write_report(&entries)?;
        Ok(entries)
    }
}

/// Walk policy for counting.
struct CountVisitor<'a> {
    report_file_name: &'a str,
    counts: CountAccumulator,
}

impl Visitor for CountVisitor<'_> {
    type Error = Infallible;

    fn decide(&mut self, entry: &WalkEntry) -> Decision {
        match entry {
            WalkEntry::Directory(_) => Decision::Skip,
            WalkEntry::Error(_) => Decision::Abort,
            WalkEntry::RegularFile { path, .. } => {
                if path
                    .file_name()
                    .is_some_and(|name| name == self.report_file_name)
                {
                    debug!(path = %path.display(), "skipping report file");
                    Decision::Skip
                } else {
                    Decision::Process
                }
            }
        }
    }

    fn process(&mut self, path: &Path, _metadata: &Metadata) -> Result<(), Infallible> {
        self.counts.add_path(path);
        Ok(())
    }
}
