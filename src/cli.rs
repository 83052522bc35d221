//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::BuildOutcome;
use clap::Parser;
use std::path::PathBuf;

/// cukemerge - merge sharded Cucumber reports
///
/// Merges the per-shard Cucumber JSON reports of a parallel mobile test
/// run into one report, writes a summary report and a Slack payload, and
/// removes the merged shard files.
///
/// Examples:
///   cukemerge
///   cukemerge --reports-dir target/cucumber-reports --outcome failed
///   cukemerge --dry-run --sort
///   cukemerge --webhook-url https://hooks.slack.com/services/...
///   cukemerge --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding the shard reports
    ///
    /// Default: target/cucumber-reports (or from .cukemerge.toml)
    #[arg(short, long, value_name = "DIR")]
    pub reports_dir: Option<PathBuf>,

    /// Shard report file extension
    #[arg(short, long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Sort shards by file name; the first one receives the merged report
    #[arg(long)]
    pub sort: bool,

    /// Output path of the summary report
    #[arg(long, value_name = "FILE")]
    pub summary_output: Option<PathBuf>,

    /// Output path of the Slack payload
    #[arg(long, value_name = "FILE")]
    pub notification_output: Option<PathBuf>,

    /// Properties file providing `app` and `platformName`
    #[arg(long, value_name = "FILE")]
    pub properties: Option<PathBuf>,

    /// App identifier shown in the notification (overrides properties)
    #[arg(long, value_name = "APP")]
    pub app: Option<String>,

    /// Platform name shown in the notification (overrides properties)
    #[arg(long, value_name = "NAME")]
    pub platform: Option<String>,

    /// Result of the test suite
    ///
    /// When omitted, the run is a success if no scenario failed.
    #[arg(long, value_name = "OUTCOME", env = "BUILD_OUTCOME")]
    pub outcome: Option<OutcomeArg>,

    /// Slack incoming webhook to post the payload to
    #[arg(long, value_name = "URL", env = "SLACK_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Webhook request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cukemerge.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: merge in memory and print statistics
    ///
    /// Nothing is written or deleted.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .cukemerge.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Suite result for --outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutcomeArg {
    #[value(alias = "passed")]
    Success,
    #[value(alias = "failure")]
    Failed,
}

impl From<OutcomeArg> for BuildOutcome {
    fn from(arg: OutcomeArg) -> Self {
        match arg {
            OutcomeArg::Success => BuildOutcome::Success,
            OutcomeArg::Failed => BuildOutcome::Failure,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref extension) = self.extension {
            if extension.trim_start_matches('.').is_empty() {
                return Err("Extension must not be empty".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref url) = self.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Webhook URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref dir) = self.reports_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Reports path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
