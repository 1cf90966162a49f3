//! End-to-end tests against an in-process stub API server.
//!
//! Each test spins up an axum server on an ephemeral port, points a client
//! or backend at it, and asserts on both the returned records and the
//! number of requests the stub actually saw.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::tempdir;

use forgestat::aggregate::Aggregator;
use forgestat::backend::{ActivityBackend, GithubBackend, GitlabBackend};
use forgestat::cache::CacheStore;
use forgestat::client::{ApiClient, FetchError};
use forgestat::models::{Metric, MetricCounts, RecordStatus};

const TIMEOUT: Duration = Duration::from_secs(5);
const NO_DELAY: Duration = Duration::ZERO;

/// Shared request counter handed to stub handlers as axum state.
#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

impl Hits {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn page_param(params: &HashMap<String, String>) -> &str {
    params.get("page").map(String::as_str).unwrap_or("1")
}

// --- Pagination -----------------------------------------------------------

async fn paged_with_header(
    State(hits): State<Hits>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    hits.0.fetch_add(1, Ordering::SeqCst);
    match page_param(&params) {
        "1" => ([("x-next-page", "2")], Json(json!([1, 2]))),
        _ => ([("x-next-page", "")], Json(json!([3]))),
    }
}

#[tokio::test]
async fn test_pagination_follows_next_page_header() {
    let hits = Hits::default();
    let router = Router::new()
        .route("/items", get(paged_with_header))
        .with_state(hits.clone());
    let url = spawn_server(router).await;

    let client = ApiClient::new(Default::default(), TIMEOUT, NO_DELAY).unwrap();
    let items = client
        .get_paginated(&format!("{}/items", url), &[])
        .await
        .unwrap();

    assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
    // Blank header on page 2 stops the walk without a third request.
    assert_eq!(hits.count(), 2);
}

async fn paged_without_header(
    State(hits): State<Hits>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    hits.0.fetch_add(1, Ordering::SeqCst);
    match page_param(&params) {
        "1" => Json(json!(["a", "b"])),
        _ => Json(json!([])),
    }
}

#[tokio::test]
async fn test_pagination_stops_on_empty_page() {
    let hits = Hits::default();
    let router = Router::new()
        .route("/items", get(paged_without_header))
        .with_state(hits.clone());
    let url = spawn_server(router).await;

    let client = ApiClient::new(Default::default(), TIMEOUT, NO_DELAY).unwrap();
    let items = client
        .get_paginated(&format!("{}/items", url), &[])
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    // No continuation header, so the empty page 2 is the terminator.
    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn test_server_error_aborts_fetch() {
    let router = Router::new().route("/items", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let url = spawn_server(router).await;

    let client = ApiClient::new(Default::default(), TIMEOUT, NO_DELAY).unwrap();
    let err = client
        .get_paginated(&format!("{}/items", url), &[])
        .await
        .unwrap_err();

    match err {
        FetchError::Status { status, .. } => assert_eq!(status.as_u16(), 500),
        other => panic!("expected status error, got {:?}", other),
    }
}

// --- GitHub backend -------------------------------------------------------

/// Search stub: alice has 3 of everything, bob does not exist.
async fn github_search(
    State(hits): State<Hits>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    hits.0.fetch_add(1, Ordering::SeqCst);
    let q = params.get("q").cloned().unwrap_or_default();
    if q.contains("bob") {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({"total_count": 3})))
}

fn github_router(hits: Hits) -> Router {
    Router::new()
        .route("/search/issues", get(github_search))
        .route("/search/commits", get(github_search))
        .with_state(hits)
}

#[tokio::test]
async fn test_failed_user_isolated_from_successful_ones() {
    let hits = Hits::default();
    let url = spawn_server(github_router(hits)).await;

    let dir = tempdir().unwrap();
    let cache = CacheStore::new(dir.path(), true);
    let backend = GithubBackend::new(&url, None, TIMEOUT, NO_DELAY).unwrap();
    let aggregator = Aggregator::new(&backend, &cache, 2024);

    let usernames = vec!["alice".to_string(), "bob".to_string()];
    let records = aggregator.run(Metric::Issues, &usernames).await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].username, "alice");
    assert_eq!(records[0].counts, MetricCounts::Issues { issue_count: 3 });
    assert_eq!(records[0].status, RecordStatus::Success);

    assert_eq!(records[1].username, "bob");
    assert_eq!(records[1].status, RecordStatus::Error);
    assert!(records[1].error.as_deref().unwrap().contains("404"));
}

#[tokio::test]
async fn test_second_run_served_from_cache() {
    let hits = Hits::default();
    let url = spawn_server(github_router(hits.clone())).await;

    let dir = tempdir().unwrap();
    let cache = CacheStore::new(dir.path(), true);
    let backend = GithubBackend::new(&url, None, TIMEOUT, NO_DELAY).unwrap();
    let aggregator = Aggregator::new(&backend, &cache, 2024);

    let usernames = vec!["alice".to_string(), "bob".to_string()];
    let first = aggregator.run(Metric::Issues, &usernames).await;
    assert_eq!(hits.count(), 2);

    // Only the successful record was persisted.
    assert!(dir.path().join("github_issues_alice_2024.json").exists());
    assert!(!dir.path().join("github_issues_bob_2024.json").exists());

    // alice comes from disk, bob is retried.
    let second = aggregator.run(Metric::Issues, &usernames).await;
    assert_eq!(hits.count(), 3);
    assert_eq!(first[0], second[0]);
}

#[tokio::test]
async fn test_disabled_cache_always_refetches() {
    let hits = Hits::default();
    let url = spawn_server(github_router(hits.clone())).await;

    let dir = tempdir().unwrap();
    let cache = CacheStore::new(dir.path(), false);
    let backend = GithubBackend::new(&url, None, TIMEOUT, NO_DELAY).unwrap();
    let aggregator = Aggregator::new(&backend, &cache, 2024);

    let usernames = vec!["alice".to_string()];
    aggregator.run(Metric::Issues, &usernames).await;
    aggregator.run(Metric::Issues, &usernames).await;
    assert_eq!(hits.count(), 2);
}

// --- GitLab backend -------------------------------------------------------

#[derive(Clone, Default)]
struct GitlabHits {
    users: Hits,
    issues: Hits,
    events: Hits,
}

/// Issue list stub: alice has exactly one issue.
async fn gitlab_issues(
    State(state): State<GitlabHits>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.issues.0.fetch_add(1, Ordering::SeqCst);
    let body = if page_param(&params) == "1" {
        json!([{"iid": 1, "state": "opened"}])
    } else {
        json!([])
    };
    ([("x-next-page", "")], Json(body))
}

async fn gitlab_users(
    State(state): State<GitlabHits>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.users.0.fetch_add(1, Ordering::SeqCst);
    let body = match params.get("username").map(String::as_str) {
        Some("alice") => json!([{"id": 7, "username": "alice"}]),
        _ => json!([]),
    };
    ([("x-next-page", "")], Json(body))
}

async fn gitlab_merge_requests(
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let body = if page_param(&params) == "1" {
        json!([
            {"iid": 1, "state": "merged"},
            {"iid": 2, "state": "opened"},
            {"iid": 3, "state": "closed"},
        ])
    } else {
        json!([])
    };
    ([("x-next-page", "")], Json(body))
}

async fn gitlab_events(
    State(state): State<GitlabHits>,
    Path(_id): Path<u64>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.events.0.fetch_add(1, Ordering::SeqCst);
    let body = if page_param(&params) == "1" {
        json!([
            {"push_data": {"commit_count": 4}},
            {"push_data": {"commit_count": 2}},
        ])
    } else {
        json!([])
    };
    ([("x-next-page", "")], Json(body))
}

fn gitlab_router(state: GitlabHits) -> Router {
    Router::new()
        .route("/api/v4/users", get(gitlab_users))
        .route("/api/v4/issues", get(gitlab_issues))
        .route("/api/v4/merge_requests", get(gitlab_merge_requests))
        .route("/api/v4/users/{id}/events", get(gitlab_events))
        .with_state(state)
}

fn gitlab_backend(url: &str, cache: CacheStore) -> GitlabBackend {
    GitlabBackend::new(url, "glpat-test", TIMEOUT, NO_DELAY, cache).unwrap()
}

#[tokio::test]
async fn test_gitlab_merged_state_filtered_client_side() {
    let url = spawn_server(gitlab_router(GitlabHits::default())).await;

    let dir = tempdir().unwrap();
    let backend = gitlab_backend(&url, CacheStore::new(dir.path(), true));
    let record = backend.merge_request_stats("alice", 2024).await;

    assert_eq!(record.status, RecordStatus::Success);
    assert_eq!(
        record.counts,
        MetricCounts::MergeRequests {
            opened: 3,
            merged: 1
        }
    );
}

#[tokio::test]
async fn test_gitlab_unknown_user_skips_events_queries() {
    let state = GitlabHits::default();
    let url = spawn_server(gitlab_router(state.clone())).await;

    let dir = tempdir().unwrap();
    let backend = gitlab_backend(&url, CacheStore::new(dir.path(), true));
    let record = backend.commit_stats("ghost", 2024).await;

    assert_eq!(record.status, RecordStatus::Error);
    assert_eq!(record.error.as_deref(), Some("User not found"));
    assert_eq!(
        record.counts,
        MetricCounts::CommitTotal { commit_count: 0 }
    );
    assert_eq!(state.events.count(), 0);
}

#[tokio::test]
async fn test_platforms_do_not_share_cached_records() {
    let gh_url = spawn_server(github_router(Hits::default())).await;
    let gl_state = GitlabHits::default();
    let gl_url = spawn_server(gitlab_router(gl_state.clone())).await;

    // Both backends share one cache directory, as in a real run.
    let dir = tempdir().unwrap();
    let cache = CacheStore::new(dir.path(), true);
    let usernames = vec!["alice".to_string()];

    let github = GithubBackend::new(&gh_url, None, TIMEOUT, NO_DELAY).unwrap();
    let records = Aggregator::new(&github, &cache, 2024)
        .run(Metric::Issues, &usernames)
        .await;
    assert_eq!(records[0].counts, MetricCounts::Issues { issue_count: 3 });

    // The GitLab run must hit its own API, not the GitHub record.
    let gitlab = gitlab_backend(&gl_url, cache.clone());
    let records = Aggregator::new(&gitlab, &cache, 2024)
        .run(Metric::Issues, &usernames)
        .await;
    assert_eq!(records[0].counts, MetricCounts::Issues { issue_count: 1 });
    assert_eq!(gl_state.issues.count(), 1);
}

#[tokio::test]
async fn test_raw_result_set_cache_survives_record_write() {
    let state = GitlabHits::default();
    let url = spawn_server(gitlab_router(state.clone())).await;

    let dir = tempdir().unwrap();
    let cache = CacheStore::new(dir.path(), true);
    let backend = gitlab_backend(&url, cache.clone());
    let aggregator = Aggregator::new(&backend, &cache, 2024);
    let usernames = vec!["alice".to_string()];

    aggregator.run(Metric::Issues, &usernames).await;

    // Raw issue list and metric record live under distinct keys, and the
    // raw entry still parses as a list after the record write-through.
    assert!(dir.path().join("issues_alice_2024.json").exists());
    assert!(dir.path().join("gitlab_issues_alice_2024.json").exists());
    let raw: Vec<Value> = cache.read("issues_alice_2024").unwrap();
    assert_eq!(raw.len(), 1);

    // A repeat run resolves entirely from the record cache.
    aggregator.run(Metric::Issues, &usernames).await;
    assert_eq!(state.issues.count(), 1);
}

#[tokio::test]
async fn test_gitlab_commits_summed_from_push_events() {
    let state = GitlabHits::default();
    let url = spawn_server(gitlab_router(state.clone())).await;

    let dir = tempdir().unwrap();
    let backend = gitlab_backend(&url, CacheStore::new(dir.path(), true));

    let record = backend.commit_stats("alice", 2024).await;
    assert_eq!(
        record.counts,
        MetricCounts::CommitTotal { commit_count: 6 }
    );
    assert_eq!(state.users.count(), 1);
    assert_eq!(state.events.count(), 1);

    // The user lookup and the raw event set are both cached, so a repeat
    // resolves without touching the network.
    let again = backend.commit_stats("alice", 2024).await;
    assert_eq!(again.counts, record.counts);
    assert_eq!(state.users.count(), 1);
    assert_eq!(state.events.count(), 1);
}
