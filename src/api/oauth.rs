//! Account linking.
//!
//! 1. GET /authorize?client_id=..&client_secret=.. stores the client pair and
//!    redirects to the Spotify consent page
//! 2. Spotify redirects back to GET /callback?code=..
//! 3. The code is stored; the first proxied call exchanges it

use super::BridgeAppState;
use crate::error::BridgeError;
use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

const CALLBACK_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>tunebridge</title></head>\
<body><h1>Authorization received</h1>\
<p>You can close this window.</p></body></html>";

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeParams {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Query parameters Spotify sends to the redirect URI
#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub fn create_oauth_router(state: Arc<BridgeAppState>) -> Router {
    Router::new()
        .route("/authorize", get(authorize))
        .route("/callback", get(callback))
        .with_state(state)
}

/// GET /authorize
async fn authorize(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Redirect, BridgeError> {
    let (Some(client_id), Some(client_secret)) = (
        non_empty(params.client_id),
        non_empty(params.client_secret),
    ) else {
        return Err(BridgeError::BadRequest(
            "Missing client_id or client_secret".to_string(),
        ));
    };

    state
        .store
        .merge_and_save(json!({
            "client_id": client_id,
            "client_secret": client_secret,
        }))
        .map_err(|e| {
            error!(error = %e, "Failed to store client credentials");
            BridgeError::storage(e)
        })?;

    info!("Client credentials stored, redirecting to Spotify");
    Ok(Redirect::temporary(&state.spotify.build_auth_url(&client_id)))
}

/// GET /callback
async fn callback(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<OAuthCallback>,
) -> Result<Html<&'static str>, BridgeError> {
    if let Some(provider_error) = params.error {
        warn!(error = %provider_error, "Authorization denied by Spotify");
        let message = match params.error_description {
            Some(description) => format!("Authorization failed: {} ({})", provider_error, description),
            None => format!("Authorization failed: {}", provider_error),
        };
        return Err(BridgeError::BadRequest(message));
    }

    let code = non_empty(params.code)
        .ok_or_else(|| BridgeError::BadRequest("No code received".to_string()))?;

    state
        .store
        .merge_and_save(json!({ "code": code }))
        .map_err(|e| {
            error!(error = %e, "Failed to store authorization code");
            BridgeError::storage(e)
        })?;

    info!("Authorization code stored");
    Ok(Html(CALLBACK_PAGE))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
