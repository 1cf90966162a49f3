//! Forgestat - contributor activity statistics for GitHub and GitLab
//!
//! A CLI tool that fetches per-user yearly activity (issues, PRs/MRs,
//! commits, comments) from a forge's REST API, caches results on disk,
//! and prints fixed-width summary tables.
//!
//! Exit codes:
//!   0 - Success (failed users still show as ERROR rows)
//!   1 - Runtime error (bad arguments, missing token, config failure)

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use forgestat::aggregate::Aggregator;
use forgestat::backend::{ActivityBackend, GithubBackend, GitlabBackend};
use forgestat::cache::CacheStore;
use forgestat::cli::Args;
use forgestat::config::Config;
use forgestat::models::{Metric, Platform};
use forgestat::report::render_summary;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Load configuration before logging: [general].verbose feeds the level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("Forgestat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args, config).await {
        error!("Run failed: {}", e);
        eprintln!("\nError: {}", e);
        std::process::exit(1);
    }
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete fetch-and-report workflow.
async fn run(args: Args, config: Config) -> Result<()> {
    let cache = CacheStore::new(config.general.cache_dir.clone(), !args.no_cache);

    // Handle --clear-cache early: no token or network needed
    if args.clear_cache {
        let removed = cache.clear()?;
        println!("Cache cleared ({} entries removed).", removed);
        return Ok(());
    }

    let usernames = resolve_usernames(&args, &config)?;
    let year = args.year.unwrap_or_else(|| Utc::now().year() - 1);
    let token = resolve_token(&args);

    let timeout = Duration::from_secs(config.api.timeout_seconds);
    let delay = Duration::from_secs(config.api.delay_seconds);

    let backend: Box<dyn ActivityBackend> = match args.platform {
        Platform::Github => {
            if token.is_none() {
                warn!("No GitHub token; unauthenticated search rate limits are tight");
            }
            Box::new(GithubBackend::new(
                &config.api.github_url,
                token.as_deref(),
                timeout,
                delay,
            )?)
        }
        Platform::Gitlab => {
            let token = token.with_context(|| {
                format!(
                    "GitLab requires a token: pass --token or set {}",
                    args.platform.token_env_var()
                )
            })?;
            Box::new(GitlabBackend::new(
                &config.api.gitlab_url,
                &token,
                timeout,
                delay,
                cache.clone(),
            )?)
        }
    };

    println!(
        "Platform: {} | Year: {} | Users: {}",
        args.platform,
        year,
        usernames.join(", ")
    );
    if args.no_cache {
        println!("[Cache disabled - fetching fresh data]");
    }

    let aggregator = Aggregator::new(backend.as_ref(), &cache, year);
    let metrics = args.metrics.clone().unwrap_or_else(|| Metric::ALL.to_vec());

    for metric in metrics {
        println!("\nFetching {} statistics for {}...", metric.label(), year);
        let records = aggregator.run(metric, &usernames).await;
        print!(
            "{}",
            render_summary(metric, &records, backend.request_label())
        );
    }

    Ok(())
}

/// Positional usernames win; otherwise fall back to the configured list.
fn resolve_usernames(args: &Args, config: &Config) -> Result<Vec<String>> {
    if !args.usernames.is_empty() {
        return Ok(args.usernames.clone());
    }
    if !config.users.default_usernames.is_empty() {
        info!("Using default usernames from config");
        return Ok(config.users.default_usernames.clone());
    }
    bail!("No usernames given: pass them as arguments or set [users].default_usernames");
}

/// --token wins; otherwise consult the platform's environment variable.
fn resolve_token(args: &Args) -> Option<String> {
    args.token
        .clone()
        .or_else(|| std::env::var(args.platform.token_env_var()).ok())
        .filter(|t| !t.is_empty())
}

/// Load configuration from file or use defaults.
///
/// Runs before the tracing subscriber exists, so problems with the default
/// file go to stderr directly. An explicit --config path that fails is fatal.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("Warning: failed to load .forgestat.toml: {}", e);
            Ok(Config::default())
        }
    }
}
