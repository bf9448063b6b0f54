//! Shared HTTP plumbing for live adapters
//!
//! Every live adapter owns a `reqwest::Client` with a timeout and a
//! `governor` token bucket. Responses are read as text and decoded into typed
//! structs here so non-JSON bodies surface as [`AdapterError::Parse`] rather
//! than panics or opaque transport errors.

use crate::types::AdapterError;
use civdata_common::config::HttpConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Token-bucket limiter owned by one adapter
pub type SourceRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Longest response-body excerpt kept in error messages
const BODY_EXCERPT_CHARS: usize = 200;

/// Client settings shared by all live adapters
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
    pub requests_per_second: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for HttpSettings {
    fn from(config: &HttpConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            user_agent: config.user_agent.clone(),
            requests_per_second: config.requests_per_second,
        }
    }
}

/// Build an HTTP client with timeout and user agent
pub fn build_client(settings: &HttpSettings) -> Result<Client, AdapterError> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .build()
        .map_err(|e| AdapterError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Build a direct rate limiter (zero is treated as one request per second)
pub fn rate_limiter(requests_per_second: u32) -> SourceRateLimiter {
    let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(per_second))
}

/// Append path segments to a base URL, percent-encoding each one
///
/// An empty final segment yields a trailing slash.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url, AdapterError> {
    let mut url = Url::parse(base)
        .map_err(|e| AdapterError::Internal(format!("Invalid base URL {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| AdapterError::Internal(format!("Base URL cannot have a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Rate-limited GET decoded as JSON into `T`
///
/// # Errors
/// * `Network` - timeout or connection failure
/// * `Status` - non-2xx response (body excerpt attached)
/// * `Parse` - body is not the expected JSON
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    limiter: &SourceRateLimiter,
    url: Url,
    query: &[(&str, &str)],
) -> Result<T, AdapterError> {
    limiter.until_ready().await;

    debug!(path = url.path(), "GET");

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(AdapterError::Status {
            status: status.as_u16(),
            body: excerpt(&body),
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| AdapterError::Parse(format!("{e} (body: {})", excerpt(&body))))
}

/// Like [`get_json`], but 404 means "no such record"
pub async fn get_json_optional<T: DeserializeOwned>(
    client: &Client,
    limiter: &SourceRateLimiter,
    url: Url,
    query: &[(&str, &str)],
) -> Result<Option<T>, AdapterError> {
    match get_json(client, limiter, url, query).await {
        Ok(value) => Ok(Some(value)),
        Err(AdapterError::Status { status: 404, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn transport_error(e: reqwest::Error) -> AdapterError {
    if e.is_timeout() {
        AdapterError::Network(format!("request timed out: {e}"))
    } else {
        AdapterError::Network(e.to_string())
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}
