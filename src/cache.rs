//! Disk-backed JSON cache for fetched activity data.
//!
//! One file per cache key under the cache directory. Entries are written
//! only after a successful fetch and never expire on their own: the queried
//! year is closed, so a snapshot stays valid until the user clears it.
//! A malformed entry reads as absent and is simply re-fetched.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::Metric;

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".forgestat-cache";

/// Cache key for a per-user metric record.
///
/// Scoped by platform: both backends share one cache directory, so without
/// the prefix a record fetched from GitHub would answer a later GitLab run
/// for the same user and year. The prefix also keeps record keys disjoint
/// from the raw result-set keys the GitLab backend writes.
pub fn record_key(platform: &str, metric: Metric, username: &str, year: i32) -> String {
    format!("{}_{}_{}_{}", platform, metric.cache_name(), username, year)
}

/// Replaces characters that are unsafe in a file name.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '&' | ':' | ' ' => '_',
            other => other,
        })
        .collect()
}

/// Key/value persistence mapping a cache key to a JSON payload on disk.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    read_enabled: bool,
}

impl CacheStore {
    /// Creates a store rooted at `dir`. When `read_enabled` is false every
    /// read misses (the `--no-cache` mode); writes still go through.
    pub fn new(dir: impl Into<PathBuf>, read_enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            read_enabled,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn reads_enabled(&self) -> bool {
        self.read_enabled
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }

    /// Returns the stored value for `key`, or `None` if there is no entry,
    /// the entry does not parse, or reads are disabled.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.read_enabled {
            debug!("cache bypassed: {}", key);
            return None;
        }

        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                debug!("cache miss: {}", key);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => {
                debug!("cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                debug!("cache entry corrupt, treating as absent: {} ({})", key, e);
                None
            }
        }
    }

    /// Persists `value` under `key`, creating the cache directory if needed
    /// and overwriting any prior entry.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create cache directory: {}", self.dir.display())
        })?;

        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(value).context("Failed to serialize cache entry")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write cache entry: {}", path.display()))?;

        debug!("cached: {}", key);
        Ok(())
    }

    /// Deletes every entry and returns how many were removed. A missing
    /// cache directory is a no-op returning 0.
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read cache directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove cache entry: {}", path.display()))?;
                count += 1;
            }
        }
        Ok(count)
    }
}
