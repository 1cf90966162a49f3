//! Platform backends implementing the activity queries.
//!
//! One resolver abstraction over both forges: each backend translates a
//! (user, year) pair into the platform's own queries and reduces the result
//! into a [`MetricRecord`]. Capability differences (server-side search vs
//! list endpoints, user-id lookup, events) live entirely inside the
//! backends; caching and rate limiting do not.

mod github;
mod gitlab;

pub use github::{GithubBackend, DEFAULT_API_URL as GITHUB_API_URL};
pub use gitlab::{GitlabBackend, DEFAULT_INSTANCE_URL as GITLAB_INSTANCE_URL};

use async_trait::async_trait;

use crate::models::{Metric, MetricRecord};

/// Diagnostic stored in records for users the platform cannot resolve.
pub const USER_NOT_FOUND: &str = "User not found";

/// One platform's set of metric resolvers.
///
/// Resolvers never fail: every fetch problem is captured into the returned
/// record's `status`/`error` fields so the aggregation run always proceeds
/// to the next user.
#[async_trait]
pub trait ActivityBackend: Send + Sync {
    /// Platform label used in progress output.
    fn name(&self) -> &'static str;

    /// Column label for pull/merge requests ("PRs" or "MRs").
    fn request_label(&self) -> &'static str;

    /// Issues opened by the user in the year.
    async fn issue_stats(&self, username: &str, year: i32) -> MetricRecord;

    /// Pull/merge requests opened and merged by the user in the year.
    async fn merge_request_stats(&self, username: &str, year: i32) -> MetricRecord;

    /// Commits attributed to the user in the year.
    async fn commit_stats(&self, username: &str, year: i32) -> MetricRecord;

    /// Issues and PRs/MRs the user commented on in the year.
    async fn comment_stats(&self, username: &str, year: i32) -> MetricRecord;

    /// Dispatches to the resolver for `metric`.
    async fn resolve(&self, metric: Metric, username: &str, year: i32) -> MetricRecord {
        match metric {
            Metric::Issues => self.issue_stats(username, year).await,
            Metric::MergeRequests => self.merge_request_stats(username, year).await,
            Metric::Commits => self.commit_stats(username, year).await,
            Metric::Comments => self.comment_stats(username, year).await,
        }
    }
}
