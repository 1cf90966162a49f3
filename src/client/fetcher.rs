//! Rate-governed HTTP GETs and transparent pagination.

use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::client::RateGovernor;

/// Items requested per page.
pub const PER_PAGE: usize = 100;

/// Continuation header sent by GitLab-style APIs; blank on the last page.
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// A failed fetch. Converted at this boundary so that one bad user or query
/// never aborts the whole aggregation run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (timeout, connection reset, bad TLS, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The body parsed but did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Malformed(&'static str),
}

/// HTTP client with default headers for one platform, paced by a shared
/// rate governor.
pub struct ApiClient {
    http: reqwest::Client,
    governor: RateGovernor,
}

impl ApiClient {
    pub fn new(
        default_headers: HeaderMap,
        timeout: Duration,
        delay: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .user_agent(concat!("forgestat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            governor: RateGovernor::new(delay),
        })
    }

    async fn send(
        &self,
        url: &str,
        params: &[(&str, &str)],
        accept: Option<&str>,
    ) -> Result<reqwest::Response, FetchError> {
        self.governor.pace().await;

        debug!("GET {} {:?}", url, params);
        let mut request = self.http.get(url).query(params);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("response: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }
        Ok(response)
    }

    /// One rate-governed GET returning the parsed JSON body.
    pub async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        Ok(self.send(url, params, None).await?.json().await?)
    }

    /// Like [`get_json`](Self::get_json) but with a per-request `Accept`
    /// override (GitHub's commit search needs a preview media type).
    pub async fn get_json_accept(
        &self,
        url: &str,
        params: &[(&str, &str)],
        accept: &str,
    ) -> Result<Value, FetchError> {
        Ok(self.send(url, params, Some(accept)).await?.json().await?)
    }

    /// Walks every page of a list endpoint and returns the concatenated
    /// items in arrival order.
    ///
    /// Pages start at 1 with a fixed page size. The walk stops on an empty
    /// page, or earlier when the server's next-page header is present but
    /// blank; when the header is absent the empty page is the only
    /// terminator. A non-2xx response at any point aborts the whole fetch.
    pub async fn get_paginated(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, FetchError> {
        let mut all_items = Vec::new();
        let mut page: u32 = 1;
        let per_page = PER_PAGE.to_string();

        loop {
            let page_str = page.to_string();
            let mut query: Vec<(&str, &str)> = params.to_vec();
            query.push(("per_page", &per_page));
            query.push(("page", &page_str));

            let response = self.send(url, &query, None).await?;
            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .map(|v| v.to_str().unwrap_or_default().to_string());

            let items: Vec<Value> = response.json().await?;
            if items.is_empty() {
                break;
            }
            all_items.extend(items);

            if matches!(next_page.as_deref(), Some("")) {
                break;
            }
            page += 1;
        }

        debug!("retrieved {} items from {}", all_items.len(), url);
        Ok(all_items)
    }
}
