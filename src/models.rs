//! Data models for activity statistics.
//!
//! This module contains the core data structures shared across the
//! application: the supported platforms and metrics, and the per-user
//! metric record that the resolvers produce and the cache persists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Forge platform to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Platform {
    /// GitHub (api.github.com search API)
    #[default]
    Github,
    /// GitLab (v4 REST API, gitlab.com or self-hosted)
    Gitlab,
}

impl Platform {
    /// Environment variable consulted for the access token.
    pub fn token_env_var(&self) -> &'static str {
        match self {
            Platform::Github => "GITHUB_TOKEN",
            Platform::Gitlab => "GITLAB_TOKEN",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Github => write!(f, "github"),
            Platform::Gitlab => write!(f, "gitlab"),
        }
    }
}

/// One of the independent activity statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Metric {
    /// Issues opened in the year
    Issues,
    /// Pull/merge requests opened and merged in the year
    MergeRequests,
    /// Commits authored/committed in the year
    Commits,
    /// Issues and PRs/MRs commented on in the year
    Comments,
}

impl Metric {
    /// All metrics, in the order they are fetched by default.
    pub const ALL: [Metric; 4] = [
        Metric::Issues,
        Metric::MergeRequests,
        Metric::Commits,
        Metric::Comments,
    ];

    /// Stable name used as the cache-key prefix for metric records.
    pub fn cache_name(&self) -> &'static str {
        match self {
            Metric::Issues => "issues",
            Metric::MergeRequests => "merge_requests",
            Metric::Commits => "commits",
            Metric::Comments => "comments",
        }
    }

    /// Human-readable label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Issues => "issue",
            Metric::MergeRequests => "merge request",
            Metric::Commits => "commit",
            Metric::Comments => "comment",
        }
    }
}

/// Outcome of resolving one metric for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Error,
}

/// Metric-specific counts.
///
/// Serialized untagged so that cache entries keep the flat JSON shape
/// (`{"username": ..., "issue_count": 3, "status": "success"}`); the field
/// sets of the variants are disjoint, which is what makes deserialization
/// unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricCounts {
    /// Issues opened.
    Issues { issue_count: u64 },
    /// Pull/merge requests opened and merged.
    MergeRequests { opened: u64, merged: u64 },
    /// Commits by author date vs committer date (GitHub commit search).
    Commits { authored: u64, committed: u64 },
    /// Total commits derived from push events (GitLab events API).
    CommitTotal { commit_count: u64 },
    /// Issues and PRs/MRs with at least one comment from the user.
    Comments {
        issues_commented: u64,
        requests_commented: u64,
    },
}

impl MetricCounts {
    /// One-line success summary printed while querying.
    ///
    /// `request_label` is the platform's name for pull/merge requests
    /// ("PRs" or "MRs") and only shows up for comment counts.
    pub fn summary_line(&self, request_label: &str) -> String {
        match self {
            MetricCounts::Issues { issue_count } => format!("{} issues", issue_count),
            MetricCounts::MergeRequests { opened, merged } => {
                format!("Opened: {}, Merged: {}", opened, merged)
            }
            MetricCounts::Commits {
                authored,
                committed,
            } => format!("Authored: {}, Committed: {}", authored, committed),
            MetricCounts::CommitTotal { commit_count } => format!("{} commits", commit_count),
            MetricCounts::Comments {
                issues_commented,
                requests_commented,
            } => format!(
                "Issues: {}, {}: {}",
                issues_commented, request_label, requests_commented
            ),
        }
    }
}

/// The per-user structured result of one statistic query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// The user the record describes.
    pub username: String,
    /// Metric-specific counts, flattened into the record.
    #[serde(flatten)]
    pub counts: MetricCounts,
    /// Whether the fetch succeeded.
    pub status: RecordStatus,
    /// Short diagnostic when `status` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricRecord {
    /// Creates a successful record.
    pub fn success(username: &str, counts: MetricCounts) -> Self {
        Self {
            username: username.to_string(),
            counts,
            status: RecordStatus::Success,
            error: None,
        }
    }

    /// Creates an error record; `counts` should hold the zeroed fields for
    /// the metric so the cache/report shape stays uniform.
    pub fn error(username: &str, counts: MetricCounts, error: impl ToString) -> Self {
        Self {
            username: username.to_string(),
            counts,
            status: RecordStatus::Error,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }
}
