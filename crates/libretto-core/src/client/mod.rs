//! HTTP transport for the media server API
//!
//! [`PlexClient`] is a pure request/response boundary: it attaches the token and
//! client identification headers, enforces a per-request timeout, retries
//! transient failures a bounded number of times and decodes the JSON body.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Product name reported to the server
pub const PRODUCT: &str = "Libretto";

/// Version reported to the server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:32400";

/// Timeout, retry and back-off settings for [`PlexClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Total attempts for a request, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on every further retry
    pub backoff: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl ClientOptions {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << exponent)
    }
}

/// Outcome of a single attempt that did not produce a value
enum AttemptError {
    /// Worth retrying (network failure, timeout, 429, 5xx)
    Retry(String),
    /// Surfaced immediately
    Fatal(Error),
}

/// Authenticated client for the media server's HTTP API
#[derive(Clone)]
pub struct PlexClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    options: ClientOptions,
}

impl std::fmt::Debug for PlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlexClient")
            .field("base_url", &self.base_url)
            .field("has_token", &!self.token.is_empty())
            .field("options", &self.options)
            .finish()
    }
}

impl PlexClient {
    /// Create a client with default timeout and retry settings
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::with_options(base_url, token, ClientOptions::default())
    }

    /// Create a client with explicit timeout and retry settings
    pub fn with_options(
        base_url: impl Into<String>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, "Created media server client");

        Ok(Self {
            http,
            base_url,
            token: token.into(),
            options: ClientOptions {
                max_attempts: options.max_attempts.max(1),
                ..options
            },
        })
    }

    /// Server base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET for `path` with the given query parameters and decode the JSON body
    pub async fn fetch(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(%path, attempt, "GET");

            match self.attempt(&url, path, query).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retry(message)) => {
                    if attempt >= self.options.max_attempts {
                        return Err(Error::Transient {
                            path: path.to_string(),
                            attempts: attempt,
                            message,
                        });
                    }
                    let delay = self.options.backoff_for(attempt);
                    warn!(
                        %path,
                        attempt,
                        max_attempts = self.options.max_attempts,
                        "Request failed ({}), retrying in {:?}",
                        message,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Value, AttemptError> {
        let response = self
            .http
            .get(url)
            .header("X-Plex-Token", &self.token)
            .header("X-Plex-Client-Identifier", format!("libretto-{}", VERSION))
            .header("X-Plex-Product", PRODUCT)
            .header("X-Plex-Version", VERSION)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| AttemptError::Retry(describe_transport_error(&e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AttemptError::Fatal(Error::Auth {
                status: status.as_u16(),
            }));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AttemptError::Retry(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(Error::HttpStatus {
                path: path.to_string(),
                status: status.as_u16(),
            }));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Retry(describe_transport_error(&e)))?;

        serde_json::from_slice(&body).map_err(|e| {
            AttemptError::Fatal(Error::Decode {
                context: path.to_string(),
                message: e.to_string(),
            })
        })
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
