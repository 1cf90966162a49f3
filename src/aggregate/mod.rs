//! Aggregation driver.
//!
//! Walks the configured user list strictly in order, one user fully
//! resolved before the next. Records are read through the cache and
//! written back only on success; a failed user contributes an error record
//! and never aborts the run.

use tracing::debug;

use crate::backend::ActivityBackend;
use crate::cache::{record_key, CacheStore};
use crate::models::{Metric, MetricRecord};

pub struct Aggregator<'a> {
    backend: &'a dyn ActivityBackend,
    cache: &'a CacheStore,
    year: i32,
}

impl<'a> Aggregator<'a> {
    pub fn new(backend: &'a dyn ActivityBackend, cache: &'a CacheStore, year: i32) -> Self {
        Self {
            backend,
            cache,
            year,
        }
    }

    /// Resolves `metric` for every username, preserving input order and
    /// returning exactly one record per user.
    pub async fn run(&self, metric: Metric, usernames: &[String]) -> Vec<MetricRecord> {
        let mut records = Vec::with_capacity(usernames.len());

        for username in usernames {
            let key = record_key(self.backend.name(), metric, username, self.year);

            if let Some(record) = self.cache.read::<MetricRecord>(&key) {
                println!(
                    "Loading {}... [cached] ✓ {}",
                    username,
                    record.counts.summary_line(self.backend.request_label())
                );
                records.push(record);
                continue;
            }

            let record = self.backend.resolve(metric, username, self.year).await;

            if record.is_success() {
                println!(
                    "Querying {}... ✓ {}",
                    username,
                    record.counts.summary_line(self.backend.request_label())
                );
                if let Err(e) = self.cache.write(&key, &record) {
                    debug!("cache write failed for {}: {}", key, e);
                }
            } else {
                println!(
                    "Querying {}... ✗ Error: {}",
                    username,
                    record.error.as_deref().unwrap_or("unknown error")
                );
            }

            records.push(record);
        }

        records
    }
}
