//! GitHub backend built on the search API.
//!
//! Every statistic is a search query whose `total_count` field already is
//! the reduction, so no pagination is needed here. Merged PRs come from a
//! second server-side `is:merged` query; GitLab instead filters merged
//! state client-side, which is an intentional platform asymmetry.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::ActivityBackend;
use crate::client::{ApiClient, FetchError};
use crate::models::{MetricCounts, MetricRecord};

/// Default API root for github.com.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Preview media type required by the commit search endpoint.
const COMMIT_SEARCH_ACCEPT: &str = "application/vnd.github.cloak-preview";

pub struct GithubBackend {
    api: ApiClient,
    base_url: String,
}

impl GithubBackend {
    /// Creates a backend against `base_url`. The token is optional;
    /// unauthenticated searches work with tighter rate limits.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout: Duration,
        delay: Duration,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            api: ApiClient::new(headers, timeout, delay)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Issues one search query and returns its `total_count`.
    async fn search_count(
        &self,
        path: &str,
        query: String,
        accept: Option<&str>,
    ) -> Result<u64, FetchError> {
        let url = self.endpoint(path);
        let params = [("q", query.as_str())];
        let body = match accept {
            Some(accept) => self.api.get_json_accept(&url, &params, accept).await?,
            None => self.api.get_json(&url, &params).await?,
        };

        body.get("total_count")
            .and_then(Value::as_u64)
            .ok_or(FetchError::Malformed("missing total_count"))
    }

    async fn opened_and_merged(&self, username: &str, year: i32) -> Result<(u64, u64), FetchError> {
        let opened = self
            .search_count(
                "search/issues",
                format!(
                    "author:{} type:pr created:{}-01-01..{}-12-31",
                    username, year, year
                ),
                None,
            )
            .await?;

        let merged = self
            .search_count(
                "search/issues",
                format!(
                    "author:{} type:pr is:merged merged:{}-01-01..{}-12-31",
                    username, year, year
                ),
                None,
            )
            .await?;

        Ok((opened, merged))
    }

    async fn authored_and_committed(
        &self,
        username: &str,
        year: i32,
    ) -> Result<(u64, u64), FetchError> {
        let authored = self
            .search_count(
                "search/commits",
                format!(
                    "author:{} author-date:{}-01-01..{}-12-31",
                    username, year, year
                ),
                Some(COMMIT_SEARCH_ACCEPT),
            )
            .await?;

        let committed = self
            .search_count(
                "search/commits",
                format!(
                    "committer:{} committer-date:{}-01-01..{}-12-31",
                    username, year, year
                ),
                Some(COMMIT_SEARCH_ACCEPT),
            )
            .await?;

        Ok((authored, committed))
    }

    async fn commented_counts(&self, username: &str, year: i32) -> Result<(u64, u64), FetchError> {
        let issues = self
            .search_count(
                "search/issues",
                format!(
                    "commenter:{} type:issue updated:{}-01-01..{}-12-31",
                    username, year, year
                ),
                None,
            )
            .await?;

        let requests = self
            .search_count(
                "search/issues",
                format!(
                    "commenter:{} type:pr updated:{}-01-01..{}-12-31",
                    username, year, year
                ),
                None,
            )
            .await?;

        Ok((issues, requests))
    }
}

#[async_trait]
impl ActivityBackend for GithubBackend {
    fn name(&self) -> &'static str {
        "github"
    }

    fn request_label(&self) -> &'static str {
        "PRs"
    }

    async fn issue_stats(&self, username: &str, year: i32) -> MetricRecord {
        let query = format!(
            "author:{} type:issue created:{}-01-01..{}-12-31",
            username, year, year
        );
        match self.search_count("search/issues", query, None).await {
            Ok(issue_count) => {
                MetricRecord::success(username, MetricCounts::Issues { issue_count })
            }
            Err(e) => MetricRecord::error(username, MetricCounts::Issues { issue_count: 0 }, e),
        }
    }

    async fn merge_request_stats(&self, username: &str, year: i32) -> MetricRecord {
        match self.opened_and_merged(username, year).await {
            Ok((opened, merged)) => {
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
        match self.authored_and_committed(username, year).await {
            Ok((authored, committed)) => MetricRecord::success(
                username,
                MetricCounts::Commits {
                    authored,
                    committed,
                },
            ),
            Err(e) => MetricRecord::error(
                username,
                MetricCounts::Commits {
                    authored: 0,
                    committed: 0,
                },
                e,
            ),
        }
    }

    async fn comment_stats(&self, username: &str, year: i32) -> MetricRecord {
        match self.commented_counts(username, year).await {
            Ok((issues_commented, requests_commented)) => MetricRecord::success(
                username,
                MetricCounts::Comments {
                    issues_commented,
                    requests_commented,
                },
            ),
            Err(e) => MetricRecord::error(
                username,
                MetricCounts::Comments {
                    issues_commented: 0,
                    requests_commented: 0,
                },
                e,
            ),
        }
    }
}
