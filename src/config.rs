//! Run configuration.
//!
//! Settings live in an optional TOML file; the source folders and the
//! extension allow-list are plain `;`-delimited lists whose first column is
//! read.
//!
//! # Settings File Format
//!
//! ```toml
//! sources_file = "inputFolders.csv"
//! extensions_file = "extensions.csv"
//! output_root = "R:\\TIMELINE"
//! report_file_name = "file_count.csv"
//! failure_policy = "abort"   # or "skip-file"
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use crate::filter::ExtensionSet;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default list of source folders.
pub const DEFAULT_SOURCES_FILE: &str = "inputFolders.csv";
/// Default extension allow-list.
pub const DEFAULT_EXTENSIONS_FILE: &str = "extensions.csv";
/// Default name of the count report written at the root of the timeline.
pub const DEFAULT_REPORT_FILE_NAME: &str = "file_count.csv";

/// Default timeline root.
#[cfg(windows)]
pub const DEFAULT_OUTPUT_ROOT: &str = "R:\\TIMELINE";
#[cfg(not(windows))]
pub const DEFAULT_OUTPUT_ROOT: &str = "TIMELINE";

/// Settings file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".timelinerc.toml";

/// Errors that can occur while reading configuration input.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested settings file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The settings file is not valid TOML or has unexpected keys/values.
    #[error("invalid configuration in {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    /// A configuration input could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A list file is not valid `;`-delimited text.
    #[error("malformed list {}: {source}", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// What the builder does when a single file cannot be copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first failing file ends the run.
    #[default]
    Abort,
    /// Log the failure, count it, and carry on with the next file.
    SkipFile,
}

/// Settings shared by the build and count passes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineConfig {
    /// List of source folders, first column of each row.
    pub sources_file: PathBuf,
    /// List of allowed extensions (with leading dot), first column of each row.
    pub extensions_file: PathBuf,
    /// Root of the timeline tree.
    pub output_root: PathBuf,
    /// Name of the count report inside `output_root`.
    pub report_file_name: String,
    pub failure_policy: FailurePolicy,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            sources_file: PathBuf::from(DEFAULT_SOURCES_FILE),
            extensions_file: PathBuf::from(DEFAULT_EXTENSIONS_FILE),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            report_file_name: DEFAULT_REPORT_FILE_NAME.to_string(),
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl TimelineConfig {
    /// Load settings, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, when given (it must exist)
    /// 2. `.timelinerc.toml` in the current directory
    /// 3. `~/.config/timeline/config.toml`
    /// 4. built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_default();
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::load_with(config_path, &cwd, home.as_deref())
    }

    /// [`TimelineConfig::load`] with the working directory and home
    /// directory given explicitly.
    pub fn load_with(
        config_path: Option<&Path>,
        cwd: &Path,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = cwd.join(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(home) = home {
            let home_config = home.join(".config").join("timeline").join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Path of the count report.
    pub fn report_path(&self) -> PathBuf {
        self.output_root.join(&self.report_file_name)
    }

    /// Reads the configured source folders, in file order.
    pub fn read_source_roots(&self) -> Result<Vec<PathBuf>, ConfigError> {
        Ok(read_first_column(&self.sources_file)?
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }

    /// Reads the configured extension allow-list.
    pub fn read_extensions(&self) -> Result<ExtensionSet, ConfigError> {
        Ok(ExtensionSet::new(read_first_column(&self.extensions_file)?))
    }
}

/// Reads the first column of every non-empty row of a `;`-delimited file.
pub fn read_first_column(path: &Path) -> Result<Vec<String>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_first_column(file).map_err(|source| ConfigError::List {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_first_column<R: Read>(reader: R) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(first) = record.get(0)
            && !first.is_empty()
        {
            values.push(first.to_string());
        }
    }
    Ok(values)
}
