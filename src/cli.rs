//! Command-line interface module for timeline.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Configuration loading and command-line overrides
//! - Build and count orchestration
//! - Mapping failures to stage-specific exit codes

use crate::aggregator::{AggregateError, TimelineAggregator};
use crate::builder::{BuildError, BuildReport, TimelineBuilder};
use crate::config::{ConfigError, FailurePolicy, TimelineConfig};
use crate::output::OutputFormatter;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "timeline", version)]
#[command(about = "Copy files into a date-bucketed timeline and count what is in it")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by both subcommands.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// TOML settings file (default: .timelinerc.toml, then ~/.config/timeline/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Copy files from the source folders into the timeline
    Build {
        #[command(flatten)]
        common: CommonArgs,
        /// List of source folders (first column, ';' delimited)
        #[arg(long, value_name = "FILE")]
        sources_file: Option<PathBuf>,
        /// List of allowed extensions such as .jpg (first column, ';' delimited)
        #[arg(long, value_name = "FILE")]
        extensions_file: Option<PathBuf>,
        /// Root of the timeline tree
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Show where files would go without copying anything
        #[arg(long)]
        dry_run: bool,
        /// Skip files that cannot be copied instead of stopping
        #[arg(long)]
        keep_going: bool,
    },
    /// Count timeline files per folder and type and write the report
    Count {
        #[command(flatten)]
        common: CommonArgs,
        /// Root of the timeline tree (default: configured output root)
        output: Option<PathBuf>,
        /// Also print the counts as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Failures of a CLI run, one variant per stage.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Error while reading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error while building the timeline: {0}")]
    Build(#[from] BuildError),
    #[error("Error while counting the timeline: {0}")]
    Count(#[from] AggregateError),
    #[error("Error while printing counts as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit status for this failure. Distinct per stage; the build
    /// and count walks share the traversal code.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Build(BuildError::Traversal { .. }) => 3,
            CliError::Count(AggregateError::Traversal { .. }) => 3,
            CliError::Build(BuildError::Io { .. }) => 4,
            CliError::Build(BuildError::DirectoryCreation { .. }) => 5,
            CliError::Count(AggregateError::ReportWrite { .. }) => 6,
            CliError::Json(_) => 7,
        }
    }
}

/// Runs a parsed command line.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use timeline::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["timeline", "count", "/srv/timeline"]);
/// if let Err(e) = run_cli(cli.command) {
///     eprintln!("{}", e);
///     std::process::exit(e.exit_code());
/// }
/// ```
pub fn run_cli(command: Command) -> Result<(), CliError> {
    match command {
        Command::Build {
            common,
            sources_file,
            extensions_file,
            output,
            dry_run,
            keep_going,
        } => {
            let mut config = TimelineConfig::load(common.config.as_deref())?;
            if let Some(path) = sources_file {
                config.sources_file = path;
            }
            if let Some(path) = extensions_file {
                config.extensions_file = path;
            }
            if let Some(path) = output {
                config.output_root = path;
            }
            if keep_going {
                config.failure_policy = FailurePolicy::SkipFile;
            }
            build_timeline(&config, dry_run).map(|_| ())
        }
        Command::Count {
            common,
            output,
            json,
        } => {
            let mut config = TimelineConfig::load(common.config.as_deref())?;
            match output {
                Some(path) => config.output_root = path,
                None if !json => OutputFormatter::info(&format!(
                    "Taking default {}",
                    config.output_root.display()
                )),
                None => {}
            }
            count_timeline(&config, json)
        }
    }
}

/// Builds the timeline described by `config`.
///
/// Both lists are read before anything is walked, so a configuration error
/// never leaves a half-built timeline behind.
pub fn build_timeline(config: &TimelineConfig, dry_run: bool) -> Result<BuildReport, CliError> {
    let extensions = config.read_extensions()?;
    let roots = config.read_source_roots()?;
    info!(
        roots = roots.len(),
        extensions = extensions.len(),
        output = %config.output_root.display(),
        "starting build"
    );

    if extensions.is_empty() {
        OutputFormatter::warning("No extensions configured; no files will be selected.");
    }
    if dry_run {
        OutputFormatter::dry_run_notice("Nothing will be written.");
    }

    let builder = TimelineBuilder::new(&config.output_root, extensions)
        .with_failure_policy(config.failure_policy)
        .with_dry_run(dry_run);

    let mut report = BuildReport::default();
    for root in &roots {
        OutputFormatter::info(&format!("FOLDER: {}", root.display()));
        let spinner = OutputFormatter::create_spinner(root);
        let result = builder.build_root(root, &mut report);
        spinner.finish_and_clear();
        result?;
    }

    if dry_run {
        for placed in &report.planned {
            OutputFormatter::plain(&format!(
                " - {}\n   → Would copy to {}",
                placed.source.display(),
                placed.destination.display()
            ));
        }
    }

    OutputFormatter::build_summary(&report, dry_run);
    if report.failed.is_empty() {
        OutputFormatter::success(if dry_run {
            "Dry run complete. No files were written."
        } else {
            "Timeline complete!"
        });
    } else {
        OutputFormatter::warning("Some files could not be copied. Please review errors above.");
    }

    Ok(report)
}

/// Counts the timeline at `config.output_root` and writes its report.
pub fn count_timeline(config: &TimelineConfig, json: bool) -> Result<(), CliError> {
    let aggregator = TimelineAggregator::new(&config.output_root, &config.report_file_name);
    let entries = aggregator.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        OutputFormatter::count_table(&entries);
        OutputFormatter::success(&format!(
            "Report written to {}",
            aggregator.report_path().display()
        ));
    }

    Ok(())
}
