//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.forgestat.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// User list settings.
    #[serde(default)]
    pub users: UsersConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Cache directory.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            verbose: false,
        }
    }
}

fn default_cache_dir() -> String {
    crate::cache::DEFAULT_CACHE_DIR.to_string()
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// GitHub API root.
    #[serde(default = "default_github_url")]
    pub github_url: String,

    /// GitLab instance URL.
    #[serde(default = "default_gitlab_url")]
    pub gitlab_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Minimum seconds between consecutive API requests.
    #[serde(default = "default_delay")]
    pub delay_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            github_url: default_github_url(),
            gitlab_url: default_gitlab_url(),
            timeout_seconds: default_timeout(),
            delay_seconds: default_delay(),
        }
    }
}

fn default_github_url() -> String {
    crate::backend::GITHUB_API_URL.to_string()
}

fn default_gitlab_url() -> String {
    crate::backend::GITLAB_INSTANCE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_delay() -> u64 {
    5
}

/// User list settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersConfig {
    /// Usernames queried when none are given on the command line.
    #[serde(default)]
    pub default_usernames: Vec<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".forgestat.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence; optional flags only override when
    /// explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref cache_dir) = args.cache_dir {
            self.general.cache_dir = cache_dir.display().to_string();
        }

        if let Some(ref gitlab_url) = args.gitlab_url {
            self.api.gitlab_url = gitlab_url.clone();
        }

        if let Some(delay) = args.delay {
            self.api.delay_seconds = delay;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }
}
