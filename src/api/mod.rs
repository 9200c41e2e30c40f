// HTTP API: OAuth linking, playback control, health

mod health;
mod oauth;
mod playback;

pub use health::{create_health_router, liveness};
pub use oauth::{create_oauth_router, AuthorizeParams, OAuthCallback};
pub use playback::{create_playback_router, DeviceParams, StepParams, VolumeParams};

use crate::config::{BridgeConfig, SpotifyConfig};
use crate::credentials::{CredentialStore, FileBackend};
use crate::normalize::Romanizer;
use crate::proxy::SpotifyProxy;
use crate::token::TokenAcquirer;
use crate::upstream::build_http_client;
use anyhow::Result;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// Shared state for every router.
#[derive(Clone)]
pub struct BridgeAppState {
    pub store: Arc<CredentialStore>,
    pub proxy: Arc<SpotifyProxy>,
    pub romanizer: Arc<Romanizer>,
    pub spotify: SpotifyConfig,
    /// HTML served at `/`, when configured
    pub static_page: Option<PathBuf>,
}

impl BridgeAppState {
    /// Build state backed by the credential file named in `config`.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let http = build_http_client(Duration::from_secs(config.http.timeout_seconds))?;
        let store = Arc::new(CredentialStore::new(FileBackend::new(
            &config.storage.credentials_path,
        )));
        Ok(Self::new(store, http, config))
    }

    pub fn new(store: Arc<CredentialStore>, http: reqwest::Client, config: &BridgeConfig) -> Self {
        let tokens = Arc::new(TokenAcquirer::new(
            store.clone(),
            http.clone(),
            &config.spotify,
        ));
        let proxy = Arc::new(SpotifyProxy::new(tokens, http, &config.spotify));

        Self {
            store,
            proxy,
            romanizer: Arc::new(Romanizer::default()),
            spotify: config.spotify.clone(),
            static_page: config.server.static_page.clone(),
        }
    }
}

/// Full application router with permissive CORS for the control page.
pub fn create_app(state: BridgeAppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .merge(create_health_router(state.clone()))
        .merge(create_oauth_router(state.clone()))
        .merge(create_playback_router(state))
        .layer(CorsLayer::permissive())
}
