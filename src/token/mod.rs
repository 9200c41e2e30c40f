//! Access token acquisition.
//!
//! Every call re-derives a bearer token from the stored grant material:
//!
//! 1. `refresh_token` stored → refresh grant (store untouched)
//! 2. otherwise `code` stored → one-time code exchange, then persist the
//!    refresh token and drop the code
//! 3. otherwise → `NoCredentialMaterial`
//!
//! Tokens are not cached between requests.

mod exchange;

#[cfg(test)]
mod tests;

pub use exchange::basic_auth_header;

use crate::config::SpotifyConfig;
use crate::credentials::{CredentialRecord, CredentialStore, CODE_KEY};
use crate::error::BridgeError;
use exchange::{request_token, Grant};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Short-lived bearer credential (never persisted)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

/// Produces access tokens from the credential store.
pub struct TokenAcquirer {
    store: Arc<CredentialStore>,
    http: reqwest::Client,
    token_url: String,
    redirect_uri: String,
    /// Serializes the one-time code exchange
    code_exchange: Mutex<()>,
}

impl TokenAcquirer {
    pub fn new(store: Arc<CredentialStore>, http: reqwest::Client, spotify: &SpotifyConfig) -> Self {
        Self {
            store,
            http,
            token_url: spotify.token_url(),
            redirect_uri: spotify.redirect_uri.clone(),
            code_exchange: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Obtain a valid access token.
    ///
    /// # Errors
    /// * `ConfigMissing` - nothing stored
    /// * `ConfigIncomplete` - client ID or secret missing
    /// * `NoCredentialMaterial` - neither refresh token nor code stored
    /// * `UpstreamTokenError` / `MalformedUpstreamPayload` / `TokenTransport` - exchange failed
    pub async fn acquire(&self) -> Result<AccessToken, BridgeError> {
        let record = self.load_record()?;
        let authorization = client_authorization(&record)?;

        if let Some(refresh_token) = record.refresh_token() {
            return self.refresh(&authorization, refresh_token).await;
        }

        if record.authorization_code().is_none() {
            return Err(BridgeError::NoCredentialMaterial);
        }

        self.exchange_code().await
    }

    fn load_record(&self) -> Result<CredentialRecord, BridgeError> {
        self.store
            .load()
            .map_err(BridgeError::storage)?
            .ok_or(BridgeError::ConfigMissing)
    }

    async fn refresh(
        &self,
        authorization: &str,
        refresh_token: &str,
    ) -> Result<AccessToken, BridgeError> {
        let response = request_token(
            &self.http,
            &self.token_url,
            authorization,
            Grant::RefreshToken(refresh_token),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "Refresh token exchange failed");
            e
        })?;

        debug!(expires_in = response.expires_in, "Access token refreshed");
        Ok(response.access_token())
    }

    /// Exchange the stored code exactly once.
    ///
    /// The record is re-read under the lock: a request that waited behind a
    /// successful exchange finds the refresh token and takes that path.
    async fn exchange_code(&self) -> Result<AccessToken, BridgeError> {
        let _guard = self.code_exchange.lock().await;

        let record = self.load_record()?;
        let authorization = client_authorization(&record)?;

        if let Some(refresh_token) = record.refresh_token() {
            debug!("Code already exchanged by a concurrent request");
            return self.refresh(&authorization, refresh_token).await;
        }

        let Some(code) = record.authorization_code() else {
            return Err(BridgeError::NoCredentialMaterial);
        };

        let grant = Grant::AuthorizationCode {
            code,
            redirect_uri: &self.redirect_uri,
        };

        match request_token(&self.http, &self.token_url, &authorization, grant).await {
            Ok(response) => {
                let mut update = Map::new();
                update.insert(CODE_KEY.to_string(), Value::Null);
                match &response.refresh_token {
                    Some(refresh_token) => {
                        update.insert(
                            "refresh_token".to_string(),
                            Value::String(refresh_token.clone()),
                        );
                    }
                    None => warn!("Code exchange returned no refresh token"),
                }

                self.store
                    .merge_and_save(Value::Object(update))
                    .map_err(|e| {
                        error!(error = %e, "Failed to persist refresh token after code exchange");
                        BridgeError::storage(e)
                    })?;

                info!(
                    has_refresh_token = response.refresh_token.is_some(),
                    "Authorization code exchanged"
                );
                Ok(response.access_token())
            }
            Err(err @ BridgeError::TokenTransport { .. }) => {
                // No upstream verdict, the code may still be unused
                warn!(error = %err, "Code exchange did not reach the token endpoint");
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "Code exchange rejected; discarding code");
                // A newer code stored by /callback meanwhile must survive
                if let Err(e) = self.store.remove_if_unchanged(CODE_KEY, code) {
                    error!(error = %e, "Failed to discard rejected authorization code");
                }
                Err(err)
            }
        }
    }
}

fn client_authorization(record: &CredentialRecord) -> Result<String, BridgeError> {
    let (client_id, client_secret) = record
        .client_pair()
        .ok_or(BridgeError::ConfigIncomplete)?;
    Ok(basic_auth_header(client_id, client_secret))
}
