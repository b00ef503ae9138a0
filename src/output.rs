//! Output formatting and styling module.
//!
//! Provides a centralized interface for user-facing CLI output: colored
//! status lines, the build spinner, and the summary tables printed after a
//! build or a count. Diagnostics go through `tracing` instead.

use crate::aggregator::CountEntry;
use crate::builder::BuildReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use timeline::output::OutputFormatter;
    /// OutputFormatter::success("Timeline complete!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a spinner shown while a source folder is walked.
    ///
    /// Hidden automatically when stderr is not a terminal.
    pub fn create_spinner(root: &Path) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Walking {}", root.display()));
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    /// Prints what a build did (or would do, for a dry run).
    pub fn build_summary(report: &BuildReport, dry_run: bool) {
        Self::header(if dry_run { "DRY RUN SUMMARY" } else { "SUMMARY" });

        let copied_label = if dry_run { "Would copy" } else { "Copied" };
        let rows = [
            ("Folders visited", report.directories),
            (copied_label, report.placed),
            ("Distinct destinations", report.distinct_destinations()),
            ("Overwritten in this run", report.overwritten),
            ("Excluded", report.excluded),
            ("Already in timeline", report.in_output),
            ("Extension not allowed", report.unmatched),
            ("Failed", report.failed.len()),
        ];
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        for (label, count) in rows {
            let count = count.to_string();
            let count = match label {
                "Failed" if report.failed.is_empty() => count.normal(),
                "Failed" => count.red().bold(),
                "Overwritten in this run" if report.overwritten > 0 => count.yellow(),
                _ => count.green(),
            };
            println!("{:<width$} | {}", label, count, width = width);
        }

        for (path, reason) in &report.failed {
            eprintln!("  - {}: {}", path.display(), reason);
        }
    }

    /// Prints count entries as a table, in the order given.
    pub fn count_table(entries: &[CountEntry]) {
        Self::header("TIMELINE COUNTS");

        let folder_width = entries
            .iter()
            .map(|entry| entry.bucket.len())
            .max()
            .unwrap_or(0)
            .max(6); // At least "Folder" width
        let type_width = entries
            .iter()
            .map(|entry| entry.file_type.len())
            .max()
            .unwrap_or(0)
            .max(9); // At least "File Type" width

        println!(
            "{:<fw$} | {:<tw$} | {}",
            "Folder".bold(),
            "File Type".bold(),
            "Count".bold(),
            fw = folder_width,
            tw = type_width
        );
        println!("{}", "-".repeat(folder_width + type_width + 14));

        for entry in entries {
            println!(
                "{:<fw$} | {:<tw$} | {}",
                entry.bucket,
                entry.file_type,
                entry.count.to_string().green(),
                fw = folder_width,
                tw = type_width
            );
        }

        let total: u64 = entries.iter().map(|entry| entry.count).sum();
        println!("{}", "-".repeat(folder_width + type_width + 14));
        println!(
            "{:<fw$} | {:<tw$} | {} {}",
            "Total".bold(),
            "",
            total.to_string().green().bold(),
            if total == 1 { "file" } else { "files" },
            fw = folder_width,
            tw = type_width
        );
    }
}
