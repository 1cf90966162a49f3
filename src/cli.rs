//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

use crate::models::{Metric, Platform};

/// Forgestat - contributor activity statistics for GitHub and GitLab
///
/// Fetches per-user yearly activity (issues, PRs/MRs, commits, comments)
/// from a forge's REST API, with a disk cache and a global request throttle.
///
/// Examples:
///   forgestat alice bob
///   forgestat --platform gitlab --token $GITLAB_TOKEN alice
///   forgestat --year 2024 --metrics issues,merge-requests alice
///   forgestat --clear-cache
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Usernames to query (falls back to the configured default list)
    #[arg(value_name = "USERNAME")]
    pub usernames: Vec<String>,

    /// Platform to query
    #[arg(short, long, value_enum, default_value_t = Platform::Github)]
    pub platform: Platform,

    /// Year to query
    ///
    /// Defaults to the most recent full calendar year.
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Personal access token
    ///
    /// Falls back to GITHUB_TOKEN or GITLAB_TOKEN depending on --platform.
    /// Required for GitLab; optional (but recommended) for GitHub.
    #[arg(short, long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// GitLab instance URL (for self-hosted instances)
    #[arg(long, value_name = "URL")]
    pub gitlab_url: Option<String>,

    /// Metrics to fetch (comma-separated)
    ///
    /// Example: --metrics issues,merge-requests. Default: all four.
    #[arg(
        short,
        long,
        value_enum,
        value_delimiter = ',',
        value_name = "METRICS"
    )]
    pub metrics: Option<Vec<Metric>>,

    /// Cache directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Bypass cache reads and fetch fresh data (writes still occur)
    #[arg(long)]
    pub no_cache: bool,

    /// Clear the cache and exit without fetching
    #[arg(long)]
    pub clear_cache: bool,

    /// Seconds to wait between API requests
    #[arg(long, value_name = "SECS")]
    pub delay: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .forgestat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.gitlab_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("GitLab URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(year) = self.year {
            if !(2000..=9999).contains(&year) {
                return Err(format!("Year out of range: {}", year));
            }
        }

        if let Some(ref metrics) = self.metrics {
            if metrics.is_empty() {
                return Err("At least one metric must be selected".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `[general].verbose`; `--quiet`
    /// overrides it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
