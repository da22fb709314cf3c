//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored
//! output, a progress spinner, and formatted tables, plus the two event sinks
//! the command line uses: a human-readable console report and JSON lines.

use crate::file_organizer::{EventSink, OrganizeEvent, RunSummary};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - A spinner for quiet runs
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortdir::output::OutputFormatter;
    /// OutputFormatter::success("photo.jpg -> Images/jpg/photo.jpg");
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

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a spinner that counts inspected files.
    ///
    /// The number of files is not known up front, so this is a spinner
    /// rather than a bar.
    pub fn create_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {pos} files inspected {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    }

    /// Prints a summary table with file statistics by category.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortdir::output::OutputFormatter;
    /// use std::collections::HashMap;
    ///
    /// let mut counts = HashMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &HashMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        // Sort categories for consistent output
        let mut categories: Vec<_> = category_counts.iter().collect();
        categories.sort_by_key(|&(name, _)| name);

        let max_category_len = categories
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in &categories {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(**count),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = max_category_len
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Prints events as they arrive and a per-category table at the end.
///
/// In quiet mode only failures are printed, with a spinner for progress.
pub struct ConsoleReporter {
    root: PathBuf,
    quiet: bool,
    spinner: Option<ProgressBar>,
    category_counts: HashMap<String, usize>,
}

impl ConsoleReporter {
    pub fn new(root: &Path, quiet: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            quiet,
            spinner: quiet.then(OutputFormatter::create_spinner),
            category_counts: HashMap::new(),
        }
    }

    /// Files moved (or to be moved) per category so far.
    pub fn category_counts(&self) -> &HashMap<String, usize> {
        &self.category_counts
    }

    /// Closes the report with totals.
    pub fn finish(&self, summary: &RunSummary, dry_run: bool) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }

        let relocated = if dry_run {
            summary.simulated()
        } else {
            summary.moved()
        };

        if !self.quiet && relocated > 0 {
            OutputFormatter::summary_table(&self.category_counts, relocated);
        }

        if self.reports_nothing_to_do(summary, relocated) {
            OutputFormatter::info("Nothing to organize.");
        }
        if summary.skipped > 0 && !self.quiet {
            OutputFormatter::plain(&format!("Skipped: {}", summary.skipped));
        }
        if summary.failed > 0 {
            OutputFormatter::warning(&format!(
                "{} {} could not be organized. Please review errors above.",
                summary.failed,
                plural(summary.failed)
            ));
        }
        if dry_run {
            OutputFormatter::dry_run_notice(&format!(
                "No files were modified. Run 'sortdir {}' without --dry-run to apply.",
                self.root.display()
            ));
        }
    }

    /// Quiet reports stay silent when there is nothing to do.
    fn reports_nothing_to_do(&self, summary: &RunSummary, relocated: usize) -> bool {
        !self.quiet && relocated == 0 && summary.failed == 0
    }

    /// Shows `path` relative to the organized root when possible.
    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn say(&self, print: impl FnOnce()) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(print),
            None => print(),
        }
    }
}

impl EventSink for ConsoleReporter {
    fn record(&mut self, event: OrganizeEvent) {
        if let Some(spinner) = &self.spinner {
            spinner.inc(1);
        }
        if self.quiet && !event.is_failure() {
            return;
        }

        match &event {
            OrganizeEvent::Moved {
                source,
                destination,
                category,
            }
            | OrganizeEvent::WouldMove {
                source,
                destination,
                category,
            } => {
                *self
                    .category_counts
                    .entry(category.dir_name().to_string())
                    .or_insert(0) += 1;

                let line = format!(
                    "{} -> {}",
                    self.display_path(source),
                    self.display_path(destination)
                );
                if matches!(event, OrganizeEvent::WouldMove { .. }) {
                    OutputFormatter::dry_run_notice(&format!("would move: {}", line));
                } else {
                    OutputFormatter::success(&line);
                }
            }
            OrganizeEvent::SkippedHidden { source }
            | OrganizeEvent::SkippedAlreadyOrganized { source }
            | OrganizeEvent::SkippedExcluded { source } => {
                let reason = match event {
                    OrganizeEvent::SkippedHidden { .. } => "hidden",
                    OrganizeEvent::SkippedExcluded { .. } => "excluded",
                    _ => "already in a category folder",
                };
                OutputFormatter::plain(&format!(
                    "  skipping ({}): {}",
                    reason,
                    self.display_path(source)
                ));
            }
            OrganizeEvent::MoveFailed { error, .. } | OrganizeEvent::WalkFailed { error, .. } => {
                let message = error.clone();
                self.say(|| OutputFormatter::error(&message));
            }
        }
    }
}

/// Writes every event as one JSON object per line.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl JsonReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for JsonReporter<W> {
    fn record(&mut self, event: OrganizeEvent) {
        let written = serde_json::to_writer(&mut self.out, &event)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!(kind = event.kind(), "could not write event: {}", e);
        }
    }
}
