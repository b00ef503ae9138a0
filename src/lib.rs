//! timeline - gather files from many folders into one dated timeline
//!
//! This library walks configured source folders, keeps files whose
//! extension is allowed and whose path carries no `$` marker, and copies
//! each one to `<output>/<YYYY_MM_DD>/<base>_<hash6><ext>`, the date being
//! the file's modification date and the hash a SHA-256 of its content. A
//! second pass counts the timeline per date folder and file type and writes
//! a `;`-delimited report.

pub mod aggregator;
pub mod builder;
pub mod cli;
pub mod config;
pub mod filter;
pub mod hasher;
pub mod output;
pub mod placement;
pub mod walk;

pub use aggregator::{AggregateError, CountAccumulator, CountEntry, TimelineAggregator};
pub use builder::{BuildError, BuildReport, TimelineBuilder};
pub use config::{ConfigError, FailurePolicy, TimelineConfig};
pub use filter::ExtensionSet;

pub use cli::{Cli, Command, run_cli};
