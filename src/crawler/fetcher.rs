//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests of a scan, including:
//! - Building the HTTP client with timeouts and pool limits
//! - Browser-like request headers with a rotating identity
//! - Classifying responses into outcomes the scanner can act on
//!
//! Fetching never fails: every problem degrades to an outcome that the
//! caller treats as "no listings on this page".

use crate::config::HttpConfig;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, DNT, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGES: &str = "de-DE,de;q=0.9,en;q=0.8";

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// HTTP 200 with the page body
    Ok(String),

    /// HTTP 429; the caller must cool down before continuing
    RateLimited,

    /// Any other non-200 status
    HttpError(u16),

    /// Connection, timeout, or body read failure
    TransportError(String),
}

impl FetchOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(body) => write!(f, "OK ({} bytes)", body.len()),
            Self::RateLimited => write!(f, "HTTP 429 (rate limited)"),
            Self::HttpError(status) => write!(f, "HTTP {}", status),
            Self::TransportError(error) => write!(f, "request error: {}", error),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The identity header is not fixed on the client; it rotates per request.
/// The idle pool is bounded per host; the total number of requests in flight
/// is bounded by [`Fetcher`].
///
/// # Example
///
/// ```no_run
/// use immo_scout::config::HttpConfig;
/// use immo_scout::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.max_connections_per_host)
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .build()
}

/// Builds the browser-like header set for one request
///
/// Accept-Encoding is left to the client, which advertises exactly the
/// codecs it can decode (gzip, deflate, br).
pub fn build_headers(user_agent: &str, referer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGES));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    if let Some(referer) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
        headers.insert(REFERER, referer);
    }

    headers
}

/// Issues GET requests and classifies the responses
///
/// At most `max_connections` requests are in flight at once across all
/// clones of a fetcher.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    permits: Arc<Semaphore>,
}

impl Fetcher {
    pub fn new(client: Client, max_connections: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    /// Builds the client and the connection cap from one config section
    pub fn from_config(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?, config.max_connections))
    }

    /// Fetches a URL with one identity drawn by the caller
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | HTTP 200 | `Ok(body)` |
    /// | HTTP 429 | `RateLimited` |
    /// | Other status | `HttpError(status)` |
    /// | Timeout, connect or body error | `TransportError` |
    pub async fn fetch(&self, url: &Url, user_agent: &str, referer: Option<&str>) -> FetchOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => return FetchOutcome::TransportError(e.to_string()),
        };
        let headers = build_headers(user_agent, referer);

        let response = match self.client.get(url.clone()).headers(headers).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::TransportError(describe_error(&e)),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return FetchOutcome::RateLimited;
        }
        if status != StatusCode::OK {
            return FetchOutcome::HttpError(status.as_u16());
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Ok(body),
            Err(e) => FetchOutcome::TransportError(describe_error(&e)),
        }
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection refused".to_string()
    } else {
        e.to_string()
    }
}
