use super::BridgeConfig;
use std::path::PathBuf;
use tracing::warn;

/// Apply `TUNEBRIDGE_*` environment overrides on top of a loaded config.
///
/// Unparseable numeric values are ignored with a warning.
pub fn apply_env_overrides(config: &mut BridgeConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut BridgeConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TUNEBRIDGE_HOST") {
        config.server.host = v;
    }
    if let Some(v) = lookup("TUNEBRIDGE_PORT") {
        match v.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %v, "Ignoring invalid TUNEBRIDGE_PORT"),
        }
    }
    if let Some(v) = lookup("TUNEBRIDGE_CREDENTIALS_PATH") {
        config.storage.credentials_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("TUNEBRIDGE_HTTP_TIMEOUT_SECONDS") {
        match v.parse() {
            Ok(secs) => config.http.timeout_seconds = secs,
            Err(_) => warn!(value = %v, "Ignoring invalid TUNEBRIDGE_HTTP_TIMEOUT_SECONDS"),
        }
    }
}
