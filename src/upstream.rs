//! Shared HTTP plumbing for calls to Spotify.

use crate::error::BridgeError;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::time::Duration;

/// Build the client used for every upstream call.
///
/// Every request is bounded by `timeout`; there is no retry policy.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("tunebridge/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Status and raw body of an upstream response.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Read status and body from a `reqwest` response.
    pub async fn read(response: reqwest::Response) -> Result<Self, BridgeError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as JSON, or `{"error_text": ...}` when it is not JSON.
    pub fn decoded_body(&self) -> Value {
        decode_body(self.status, &self.body)
    }

    /// The failure this response represents as a proxied call.
    pub fn call_error(&self) -> BridgeError {
        BridgeError::UpstreamCallError {
            status: self.status,
            body: self.decoded_body(),
        }
    }
}

/// Decode an upstream body, never failing.
///
/// Non-JSON bodies become `{"error_text": <raw body>}`; an empty body falls
/// back to the HTTP status phrase.
pub fn decode_body(status: u16, body: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value;
    }

    let text = if body.trim().is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status))
    } else {
        body.to_string()
    };

    json!({ "error_text": text })
}

pub(crate) fn transport_error(err: reqwest::Error) -> BridgeError {
    BridgeError::Transport {
        message: err.to_string(),
    }
}
