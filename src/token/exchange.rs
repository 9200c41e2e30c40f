//! Token endpoint exchange logic.
//!
//! Handles both grants the bridge uses: `authorization_code` for the first
//! exchange and `refresh_token` afterwards.

use super::AccessToken;
use crate::error::BridgeError;
use crate::upstream::UpstreamResponse;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;

/// Grant presented to the token endpoint
#[derive(Debug, Clone, Copy)]
pub(crate) enum Grant<'a> {
    RefreshToken(&'a str),
    AuthorizationCode { code: &'a str, redirect_uri: &'a str },
}

impl<'a> Grant<'a> {
    pub(crate) fn grant_type(&self) -> &'static str {
        match self {
            Grant::RefreshToken(_) => "refresh_token",
            Grant::AuthorizationCode { .. } => "authorization_code",
        }
    }

    fn form(&self) -> Vec<(&'static str, &'a str)> {
        match *self {
            Grant::RefreshToken(token) => {
                vec![("grant_type", "refresh_token"), ("refresh_token", token)]
            }
            Grant::AuthorizationCode { code, redirect_uri } => vec![
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ],
        }
    }
}

/// Token endpoint response (standard OAuth 2.0)
#[derive(Deserialize, Debug)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_expires_in() -> u64 {
    3600
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    pub(crate) fn access_token(&self) -> AccessToken {
        AccessToken {
            access_token: self.access_token.clone(),
            expires_in: self.expires_in,
            token_type: self.token_type.clone(),
        }
    }
}

/// `Authorization` header value for client authentication: `Basic base64(id:secret)`.
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", client_id, client_secret))
    )
}

/// POST a grant to the token endpoint.
///
/// # Returns
/// * `Ok(TokenResponse)` - 2xx with a usable token body
/// * `Err(UpstreamTokenError)` - non-2xx; body decoded or wrapped as `error_text`
/// * `Err(MalformedUpstreamPayload)` - 2xx without a parseable token
/// * `Err(TokenTransport)` - endpoint unreachable
pub(crate) async fn request_token(
    client: &reqwest::Client,
    token_url: &str,
    authorization: &str,
    grant: Grant<'_>,
) -> Result<TokenResponse, BridgeError> {
    tracing::debug!(
        grant_type = grant.grant_type(),
        "Requesting token from {}",
        token_url
    );

    let response = client
        .post(token_url)
        .header("Authorization", authorization)
        .header("Accept", "application/json")
        .form(&grant.form())
        .send()
        .await
        .map_err(|e| BridgeError::TokenTransport {
            message: e.to_string(),
        })?;

    let upstream = UpstreamResponse::read(response)
        .await
        .map_err(|e| match e {
            BridgeError::Transport { message } => BridgeError::TokenTransport { message },
            other => other,
        })?;

    if !upstream.is_success() {
        return Err(BridgeError::UpstreamTokenError {
            status: upstream.status,
            body: upstream.decoded_body(),
        });
    }

    let token: TokenResponse = serde_json::from_str(&upstream.body).map_err(|_| {
        BridgeError::MalformedUpstreamPayload {
            body: upstream.decoded_body(),
        }
    })?;

    tracing::debug!(
        grant_type = grant.grant_type(),
        has_refresh_token = token.refresh_token.is_some(),
        expires_in = token.expires_in,
        "Token exchange successful"
    );

    Ok(token)
}
