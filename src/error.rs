//! Error taxonomy shared by the token, proxy and API layers.
//!
//! Every variant renders as `{"error": ...}` with an HTTP status reflecting
//! the nearest cause: 400 for local credential problems and token-endpoint
//! failures, the upstream's own status when a proxied call fails.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

/// Errors surfaced to callers of the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// No credential record has been persisted yet
    ConfigMissing,
    /// Record exists but `client_id` or `client_secret` is absent
    ConfigIncomplete,
    /// Neither an authorization code nor a refresh token is stored
    NoCredentialMaterial,
    /// Token endpoint answered with a non-success status
    UpstreamTokenError { status: u16, body: Value },
    /// Web API answered a proxied call with an error status
    UpstreamCallError { status: u16, body: Value },
    /// Upstream answered successfully but the body was unusable
    MalformedUpstreamPayload { body: Value },
    /// Token endpoint could not be reached
    TokenTransport { message: String },
    /// Web API could not be reached (connect error, timeout, broken body)
    Transport { message: String },
    /// Credential persistence failed
    Storage { message: String },
    /// Caller supplied invalid parameters
    BadRequest(String),
}

impl BridgeError {
    /// HTTP status returned to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::ConfigMissing
            | BridgeError::ConfigIncomplete
            | BridgeError::NoCredentialMaterial
            | BridgeError::UpstreamTokenError { .. }
            | BridgeError::MalformedUpstreamPayload { .. }
            | BridgeError::TokenTransport { .. }
            | BridgeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::UpstreamCallError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            BridgeError::Transport { .. } => StatusCode::BAD_GATEWAY,
            BridgeError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value placed under the `error` key of the response body.
    ///
    /// Upstream failures echo the upstream body (decoded JSON or the
    /// `error_text` fallback); local failures are plain messages.
    pub fn detail(&self) -> Value {
        match self {
            BridgeError::UpstreamTokenError { body, .. }
            | BridgeError::UpstreamCallError { body, .. }
            | BridgeError::MalformedUpstreamPayload { body } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        BridgeError::Storage {
            message: format!("{:#}", err),
        }
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::ConfigMissing => write!(f, "No stored Spotify credentials"),
            BridgeError::ConfigIncomplete => write!(f, "Missing client_id or client_secret"),
            BridgeError::NoCredentialMaterial => write!(f, "No code available"),
            BridgeError::UpstreamTokenError { status, body } => {
                write!(f, "Token endpoint returned {}: {}", status, body)
            }
            BridgeError::UpstreamCallError { status, body } => {
                write!(f, "Spotify API returned {}: {}", status, body)
            }
            BridgeError::MalformedUpstreamPayload { body } => {
                write!(f, "Malformed upstream payload: {}", body)
            }
            BridgeError::TokenTransport { message } => {
                write!(f, "Token endpoint unreachable: {}", message)
            }
            BridgeError::Transport { message } => write!(f, "Upstream unreachable: {}", message),
            BridgeError::Storage { message } => write!(f, "Credential storage failed: {}", message),
            BridgeError::BadRequest(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.detail() }))).into_response()
    }
}
