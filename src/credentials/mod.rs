//! Persistent Spotify credential record.
//!
//! A single record per process holds the OAuth client pair plus whichever
//! grant material drives the next token exchange:
//!
//! ```text
//!   /authorize            /callback              first exchange
//! {client_id, secret} → {.., code} ──────────→ {.., refresh_token}
//! ```
//!
//! The `code → refresh_token` transition happens once. After it, the refresh
//! token always wins and `code` is gone from the record.
//!
//! # Usage
//!
//! ```no_run
//! use tunebridge::credentials::{CredentialStore, FileBackend};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = CredentialStore::new(FileBackend::new("spotify_config.json"));
//!
//! store.merge_and_save(json!({"client_id": "id", "client_secret": "secret"}))?;
//!
//! if let Some(record) = store.load()? {
//!     println!("has refresh token: {}", record.refresh_token.is_some());
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod storage;


pub use storage::{CredentialStore, FileBackend, MemoryBackend};

/// JSON key under which the pending authorization code is stored.
pub const CODE_KEY: &str = "code";

/// Credentials persisted between runs.
///
/// Unknown keys in the stored object are kept in `extra` so a merge never
/// drops data this process does not understand.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Single-use code from the redirect callback, pending first exchange
    #[serde(rename = "code", default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,

    /// Long-lived grant; supersedes `authorization_code` once present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialRecord {
    /// Client ID and secret, when both are present and non-empty.
    pub fn client_pair(&self) -> Option<(&str, &str)> {
        let id = self.client_id.as_deref().filter(|s| !s.is_empty())?;
        let secret = self.client_secret.as_deref().filter(|s| !s.is_empty())?;
        Some((id, secret))
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|s| !s.is_empty())
    }

    pub fn authorization_code(&self) -> Option<&str> {
        self.authorization_code.as_deref().filter(|s| !s.is_empty())
    }
}

/// Raw storage for the credential object.
///
/// Implementations only move whole JSON objects; merging and typing happen
/// in [`CredentialStore`].
pub trait CredentialBackend: Send + Sync {
    /// Returns `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<Map<String, Value>>>;

    /// Replaces the stored object. Readers must never observe a partial write.
    fn write(&self, record: &Map<String, Value>) -> Result<()>;
}
