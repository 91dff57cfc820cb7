//! Outbound delivery to a webhook's target URL.
//!
//! A delivery is attempted exactly once. Failures are returned to the caller
//! and never retried, since the downstream effect may not be idempotent.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{error, info};

/// Failure to deliver a payload downstream.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("forward to {url} timed out after {timeout_ms}ms")]
    Timeout {
        url: String,
        timeout_ms: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("forward to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Downstream response relayed back to the original caller.
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Shared HTTP client for forwarding deliveries.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `body` verbatim to `url` as JSON and collect the response.
    pub async fn forward(&self, url: &str, body: Bytes) -> Result<Forwarded, ForwardError> {
        info!(
            url = url,
            body_length = body.len(),
            timeout_seconds = self.timeout.as_secs_f64(),
            "forward_starting"
        );

        let result = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body)
            .send()
            .await;

        let response = match result {
            Ok(resp) => resp,
            Err(e) => return Err(self.classify(url, e)),
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return Err(self.classify(url, e)),
        };

        info!(
            url = url,
            status_code = status,
            response_length = body.len(),
            "forward_complete"
        );

        Ok(Forwarded {
            status,
            content_type,
            body,
        })
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> ForwardError {
        if e.is_timeout() {
            error!(
                url = url,
                timeout_seconds = self.timeout.as_secs_f64(),
                error = %e,
                "forward_timeout"
            );
            ForwardError::Timeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
                source: e,
            }
        } else {
            error!(url = url, error = %e, "forward_failed");
            ForwardError::Transport {
                url: url.to_string(),
                source: e,
            }
        }
    }
}
