pub mod env;

pub use env::apply_env_overrides;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Complete bridge configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Local listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Control page served on `GET /`; liveness JSON when unset or unreadable
    #[serde(default)]
    pub static_page: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_page: None,
        }
    }
}

/// Spotify endpoints and OAuth client settings
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    /// Accounts service base (authorize + token endpoints)
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    /// Web API base, including the version segment
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Must match the redirect URI registered for the client
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:8000/callback".to_string()
}

fn default_scopes() -> Vec<String> {
    vec![
        "user-read-playback-state".to_string(),
        "user-modify-playback-state".to_string(),
    ]
}

impl SpotifyConfig {
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url.trim_end_matches('/'))
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url.trim_end_matches('/'))
    }

    /// Build the user-facing authorization URL for a client ID.
    pub fn build_auth_url(&self, client_id: &str) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}",
            self.authorize_url(),
            urlencoding::encode(client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes)
        )
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            accounts_url: default_accounts_url(),
            api_url: default_api_url(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
        }
    }
}

/// Credential persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("spotify_config.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Upper bound for every upstream call (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: BridgeConfig = toml::from_str(&contents).context("Failed to parse config TOML")?;
    Ok(config)
}

/// Load the config file if it exists, fall back to defaults otherwise.
pub fn load_or_default(path: &Path) -> Result<BridgeConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(BridgeConfig::default())
    }
}
