//! Authenticated calls to the Spotify Web API.
//!
//! Each call acquires a fresh access token, attaches it as a bearer
//! credential and hands back the raw upstream status and body. Non-JSON and
//! error bodies are not interpreted here; the normalizer does that.

use crate::config::SpotifyConfig;
use crate::error::BridgeError;
use crate::token::TokenAcquirer;
use crate::upstream::{transport_error, UpstreamResponse};
use reqwest::{header::CONTENT_LENGTH, Method};
use std::sync::Arc;
use tracing::{debug, warn};

pub const CURRENTLY_PLAYING: &str = "me/player/currently-playing";
pub const PLAYER: &str = "me/player";
pub const DEVICES: &str = "me/player/devices";

/// Playback commands exposed as control endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackCommand {
    Pause,
    Play,
    Next,
    Previous,
    Volume,
}

impl PlaybackCommand {
    pub fn method(self) -> Method {
        match self {
            PlaybackCommand::Pause | PlaybackCommand::Play | PlaybackCommand::Volume => Method::PUT,
            PlaybackCommand::Next | PlaybackCommand::Previous => Method::POST,
        }
    }

    pub fn resource_path(self) -> &'static str {
        match self {
            PlaybackCommand::Pause => "me/player/pause",
            PlaybackCommand::Play => "me/player/play",
            PlaybackCommand::Next => "me/player/next",
            PlaybackCommand::Previous => "me/player/previous",
            PlaybackCommand::Volume => "me/player/volume",
        }
    }
}

pub struct SpotifyProxy {
    tokens: Arc<TokenAcquirer>,
    http: reqwest::Client,
    api_base: String,
}

impl SpotifyProxy {
    pub fn new(tokens: Arc<TokenAcquirer>, http: reqwest::Client, spotify: &SpotifyConfig) -> Self {
        Self {
            tokens,
            http,
            api_base: spotify.api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenAcquirer> {
        &self.tokens
    }

    /// Perform an authenticated upstream call.
    ///
    /// `device_id` is sent first in the query string, followed by `query`.
    /// Any token failure returns before a request is made.
    pub async fn call(
        &self,
        method: Method,
        resource_path: &str,
        device_id: Option<&str>,
        query: &[(&str, String)],
    ) -> Result<UpstreamResponse, BridgeError> {
        let token = self.tokens.acquire().await?;

        let url = self.build_url(resource_path, device_id, query)?;
        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&token.access_token);

        // Spotify rejects bodiless PUT/POST without an explicit length
        if method == Method::PUT || method == Method::POST {
            request = request.header(CONTENT_LENGTH, "0");
        }

        let response = request.send().await.map_err(|e| {
            warn!(%method, path = resource_path, error = %e, "Upstream call failed");
            transport_error(e)
        })?;

        let upstream = UpstreamResponse::read(response).await?;
        debug!(
            %method,
            path = resource_path,
            status = upstream.status,
            "Upstream call completed"
        );
        Ok(upstream)
    }

    pub async fn get(&self, resource_path: &str) -> Result<UpstreamResponse, BridgeError> {
        self.call(Method::GET, resource_path, None, &[]).await
    }

    /// Send a playback command and return the upstream status code.
    pub async fn command(
        &self,
        command: PlaybackCommand,
        device_id: Option<&str>,
        query: &[(&str, String)],
    ) -> Result<u16, BridgeError> {
        let response = self
            .call(command.method(), command.resource_path(), device_id, query)
            .await?;
        Ok(response.status)
    }

    fn build_url(
        &self,
        resource_path: &str,
        device_id: Option<&str>,
        query: &[(&str, String)],
    ) -> Result<String, BridgeError> {
        let mut url = format!("{}/{}", self.api_base, resource_path.trim_start_matches('/'));

        let mut params: Vec<(&str, &str)> = Vec::with_capacity(query.len() + 1);
        if let Some(device_id) = device_id.filter(|id| !id.is_empty()) {
            params.push(("device_id", device_id));
        }
        params.extend(query.iter().map(|(k, v)| (*k, v.as_str())));

        if !params.is_empty() {
            let encoded = serde_urlencoded::to_string(&params)
                .map_err(|e| BridgeError::BadRequest(format!("Invalid query: {}", e)))?;
            url.push('?');
            url.push_str(&encoded);
        }
        Ok(url)
    }
}
