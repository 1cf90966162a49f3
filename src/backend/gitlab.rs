//! GitLab backend built on the v4 REST API.
//!
//! Issues and merge requests come from the list endpoints (paginated,
//! reduced client-side); commits and comments come from the user events
//! API, which needs the numeric user id first. Raw result sets and user
//! lookups are cached here so a re-run of a different metric can reuse
//! them without touching the network.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{ActivityBackend, USER_NOT_FOUND};
use crate::cache::CacheStore;
use crate::client::{ApiClient, FetchError};
use crate::models::{MetricCounts, MetricRecord};

/// Default instance URL.
pub const DEFAULT_INSTANCE_URL: &str = "https://gitlab.com";

/// Header carrying the personal access token.
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

pub struct GitlabBackend {
    api: ApiClient,
    base_url: String,
    cache: CacheStore,
}

impl GitlabBackend {
    /// Creates a backend against a GitLab instance. A token is required;
    /// the caller rejects a missing one before any network activity.
    pub fn new(
        instance_url: &str,
        token: &str,
        timeout: Duration,
        delay: Duration,
        cache: CacheStore,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(token)?;
        value.set_sensitive(true);
        headers.insert(TOKEN_HEADER, value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            api: ApiClient::new(headers, timeout, delay)?,
            base_url: format!("{}/api/v4", instance_url.trim_end_matches('/')),
            cache,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Fetches a full paginated result set, consulting the cache first and
    /// writing through on success.
    async fn list_cached(
        &self,
        cache_key: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, FetchError> {
        if let Some(items) = self.cache.read::<Vec<Value>>(cache_key) {
            return Ok(items);
        }

        let items = self.api.get_paginated(&self.endpoint(path), params).await?;
        if let Err(e) = self.cache.write(cache_key, &items) {
            debug!("cache write failed for {}: {}", cache_key, e);
        }
        Ok(items)
    }

    /// Resolves a username to its numeric id, or `None` for an unknown
    /// user. Successful lookups are cached under their own key.
    async fn user_id(&self, username: &str) -> Result<Option<u64>, FetchError> {
        let cache_key = format!("user_{}", username);
        if let Some(user) = self.cache.read::<Value>(&cache_key) {
            return Ok(user.get("id").and_then(Value::as_u64));
        }

        let users = self
            .api
            .get_paginated(&self.endpoint("users"), &[("username", username)])
            .await?;

        match users.first() {
            Some(user) => {
                if let Err(e) = self.cache.write(&cache_key, user) {
                    debug!("cache write failed for {}: {}", cache_key, e);
                }
                Ok(user.get("id").and_then(Value::as_u64))
            }
            None => Ok(None),
        }
    }

    async fn issues_in_year(&self, username: &str, year: i32) -> Result<Vec<Value>, FetchError> {
        let created_after = format!("{}-01-01T00:00:00Z", year);
        let created_before = format!("{}-12-31T23:59:59Z", year);
        self.list_cached(
            &format!("issues_{}_{}", username, year),
            "issues",
            &[
                ("author_username", username),
                ("scope", "all"),
                ("created_after", &created_after),
                ("created_before", &created_before),
            ],
        )
        .await
    }

    async fn merge_requests_in_year(
        &self,
        username: &str,
        year: i32,
    ) -> Result<Vec<Value>, FetchError> {
        let created_after = format!("{}-01-01T00:00:00Z", year);
        let created_before = format!("{}-12-31T23:59:59Z", year);
        self.list_cached(
            &format!("mrs_{}_{}", username, year),
            "merge_requests",
            &[
                ("author_username", username),
                ("scope", "all"),
                ("created_after", &created_after),
                ("created_before", &created_before),
            ],
        )
        .await
    }

    /// Events of one action kind for a user id, bounded to the year.
    async fn user_events(
        &self,
        user_id: u64,
        year: i32,
        action: &str,
    ) -> Result<Vec<Value>, FetchError> {
        let after = format!("{}-01-01", year);
        let before = format!("{}-01-01", year + 1);
        self.list_cached(
            &format!("events_{}_{}_{}", user_id, year, action),
            &format!("users/{}/events", user_id),
            &[("after", &after), ("before", &before), ("action", action)],
        )
        .await
    }
}

#[async_trait]
impl ActivityBackend for GitlabBackend {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn request_label(&self) -> &'static str {
        "MRs"
    }

    async fn issue_stats(&self, username: &str, year: i32) -> MetricRecord {
        match self.issues_in_year(username, year).await {
            Ok(issues) => MetricRecord::success(
                username,
                MetricCounts::Issues {
                    issue_count: issues.len() as u64,
                },
            ),
            Err(e) => MetricRecord::error(username, MetricCounts::Issues { issue_count: 0 }, e),
        }
    }

    async fn merge_request_stats(&self, username: &str, year: i32) -> MetricRecord {
        match self.merge_requests_in_year(username, year).await {
            Ok(mrs) => {
                let opened = mrs.len() as u64;
                // The list endpoint has no merged-in-window filter, so
                // merged state is reduced client-side.
                let merged = mrs
                    .iter()
                    .filter(|mr| mr.get("state").and_then(Value::as_str) == Some("merged"))
                    .count() as u64;
                MetricRecord::success(username, MetricCounts::MergeRequests { opened, merged })
            }
            Err(e) => MetricRecord::error(
                username,
                MetricCounts::MergeRequests {
                    opened: 0,
                    merged: 0,
                },
                e,
            ),
        }
    }

    async fn commit_stats(&self, username: &str, year: i32) -> MetricRecord {
        let zero = MetricCounts::CommitTotal { commit_count: 0 };

        let user_id = match self.user_id(username).await {
            Ok(Some(id)) => id,
            Ok(None) => return MetricRecord::error(username, zero, USER_NOT_FOUND),
            Err(e) => return MetricRecord::error(username, zero, e),
        };

        match self.user_events(user_id, year, "pushed").await {
            Ok(events) => {
                // push_data carries the commit count for each push event.
                let commit_count = events
                    .iter()
                    .filter_map(|event| event.get("push_data"))
                    .filter_map(|push| push.get("commit_count"))
                    .filter_map(Value::as_u64)
                    .sum();
                debug!(
                    "user {}: {} commits from {} push events",
                    username,
                    commit_count,
                    events.len()
                );
                MetricRecord::success(username, MetricCounts::CommitTotal { commit_count })
            }
            Err(e) => MetricRecord::error(username, zero, e),
        }
    }

    async fn comment_stats(&self, username: &str, year: i32) -> MetricRecord {
        let zero = MetricCounts::Comments {
            issues_commented: 0,
            requests_commented: 0,
        };

        let user_id = match self.user_id(username).await {
            Ok(Some(id)) => id,
            Ok(None) => return MetricRecord::error(username, zero, USER_NOT_FOUND),
            Err(e) => return MetricRecord::error(username, zero, e),
        };

        match self.user_events(user_id, year, "commented").await {
            Ok(events) => {
                let noteable_type = |event: &Value| -> Option<String> {
                    event
                        .get("note")?
                        .get("noteable_type")?
                        .as_str()
                        .map(String::from)
                };
                let issues_commented = events
                    .iter()
                    .filter(|e| noteable_type(e).as_deref() == Some("Issue"))
                    .count() as u64;
                let requests_commented = events
                    .iter()
                    .filter(|e| noteable_type(e).as_deref() == Some("MergeRequest"))
                    .count() as u64;
                MetricRecord::success(
                    username,
                    MetricCounts::Comments {
                        issues_commented,
                        requests_commented,
                    },
                )
            }
            Err(e) => MetricRecord::error(username, zero, e),
        }
    }
}
