//! Command-line interface module for sortdir.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging flags with configuration defaults
//! - Wiring the relocator to a console or JSON report

use crate::config::{ConfigError, OrganizeDefaults, OrganizerConfig};
use crate::file_category::{Classifier, ContentSniffer, NoContentType};
use crate::file_organizer::{OrganizeError, Relocator, RunOptions, RunSummary};
use crate::output::{ConsoleReporter, JsonReporter, OutputFormatter};
use clap::{ArgAction, Parser};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Sort files into Category/extension folders.
#[derive(Debug, Clone, Parser)]
#[command(name = "sortdir", version, about)]
pub struct Cli {
    /// Directory to organize
    #[arg(default_value = ".")]
    pub target: PathBuf,

    /// Scan directories recursively (the default)
    #[arg(short, long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Only organize files directly inside the target
    #[arg(long, overrides_with = "recursive")]
    pub no_recursive: bool,

    /// Show what would be done without moving files
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Replace files with the same name at the destination
    #[arg(long)]
    pub overwrite: bool,

    /// Include hidden files and directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Only report failures
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,

    /// Print one JSON event per line instead of the console report
    #[arg(long)]
    pub json: bool,

    /// Classify by extension only, without reading file contents
    #[arg(long)]
    pub no_sniff: bool,

    /// Configuration file (default: ./.sortdirrc.toml, then ~/.config/sortdir/config.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolves the run flags: explicit flags win, then configuration.
    pub fn run_options(&self, defaults: &OrganizeDefaults) -> RunOptions {
        let recursive = if self.recursive {
            true
        } else if self.no_recursive {
            false
        } else {
            defaults.recursive
        };

        RunOptions {
            recursive,
            dry_run: self.dry_run,
            overwrite: self.overwrite || defaults.overwrite,
            include_hidden: self.include_hidden || defaults.include_hidden,
        }
    }

    /// Log filter directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Errors that stop a run before any file is touched.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
}

/// Runs the CLI application for parsed arguments.
///
/// Returns the run summary; per-file failures are in it rather than in the
/// error, so the caller can pick an exit code.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use sortdir::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["sortdir", "/path/to/directory", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(summary) => println!("{} files would move", summary.simulated()),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RunSummary, CliError> {
    let config = OrganizerConfig::load(cli.config.as_deref())?;
    let filters = config.compile_filters()?;
    let table = config.extension_table()?;

    let classifier = if cli.no_sniff {
        Classifier::new(table, NoContentType)
    } else {
        Classifier::new(table, ContentSniffer)
    };
    tracing::debug!(
        extensions = classifier.table().len(),
        sniff = !cli.no_sniff,
        "classifier ready"
    );
    let relocator = Relocator::new(classifier, filters);

    let root = fs::canonicalize(&cli.target).unwrap_or_else(|_| cli.target.clone());
    let options = cli.run_options(&config.organize);
    tracing::debug!(?options, root = %root.display(), "resolved run options");

    if cli.json {
        let mut reporter = JsonReporter::stdout();
        return Ok(relocator.run(&root, &options, &mut reporter)?);
    }

    if !cli.quiet {
        let prefix = if options.dry_run { "DRY RUN: " } else { "" };
        OutputFormatter::info(&format!(
            "{}Organizing contents of: {}",
            prefix,
            root.display()
        ));
    }

    let mut reporter = ConsoleReporter::new(&root, cli.quiet);
    let summary = relocator.run(&root, &options, &mut reporter)?;
    reporter.finish(&summary, options.dry_run);

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sortdir").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.target, PathBuf::from("."));
        assert_eq!(
            cli.run_options(&OrganizeDefaults::default()),
            RunOptions {
                recursive: true,
                dry_run: false,
                overwrite: false,
                include_hidden: false,
            }
        );
        assert_eq!(cli.log_level(), "error");
    }

    #[test]
    fn test_flags_override_config_defaults() {
        let defaults = OrganizeDefaults {
            recursive: false,
            include_hidden: false,
            overwrite: false,
        };

        let cli = parse(&["downloads", "-r", "-n", "--overwrite", "--include-hidden"]);
        let options = cli.run_options(&defaults);
        assert!(options.recursive);
        assert!(options.dry_run);
        assert!(options.overwrite);
        assert!(options.include_hidden);
        assert_eq!(cli.target, PathBuf::from("downloads"));
    }

    #[test]
    fn test_no_recursive() {
        let cli = parse(&["--no-recursive"]);
        assert!(!cli.run_options(&OrganizeDefaults::default()).recursive);

        // The last of the pair wins.
        let cli = parse(&["--no-recursive", "--recursive"]);
        assert!(cli.run_options(&OrganizeDefaults::default()).recursive);
    }

    #[test]
    fn test_config_defaults_apply_without_flags() {
        let defaults = OrganizeDefaults {
            recursive: false,
            include_hidden: true,
            overwrite: true,
        };
        let options = parse(&[]).run_options(&defaults);
        assert!(!options.recursive);
        assert!(options.include_hidden);
        assert!(options.overwrite);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["-v"]).log_level(), "info");
        assert_eq!(parse(&["-vv"]).log_level(), "debug");
        assert_eq!(parse(&["-vvvv"]).log_level(), "trace");
    }

    #[test]
    fn test_quiet_conflicts_with_json() {
        let result = Cli::try_parse_from(["sortdir", "--quiet", "--json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = parse(&["--config", "/non/existent/sortdir.toml"]);
        assert!(matches!(run_cli(&cli), Err(CliError::Config(_))));
    }
}
