use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use tunebridge::api::{create_app, BridgeAppState};
use tunebridge::config::{apply_env_overrides, load_or_default};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunebridge=info".into()),
        )
        .init();

    info!("tunebridge starting...");

    let config_path = std::env::var("TUNEBRIDGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("tunebridge.toml"));
    let mut config = load_or_default(&config_path)?;
    apply_env_overrides(&mut config);

    info!(
        config = %config_path.display(),
        credentials = %config.storage.credentials_path.display(),
        timeout_seconds = config.http.timeout_seconds,
        "Configuration loaded"
    );

    let state = BridgeAppState::from_config(&config)?;
    match state.store.load() {
        Ok(Some(record)) if record.refresh_token().is_some() => {
            info!("Spotify account already linked")
        }
        Ok(_) => info!(
            "Link a Spotify account: http://localhost:{}/authorize?client_id=<id>&client_secret=<secret>",
            config.server.port
        ),
        Err(e) => warn!(error = %e, "Credential file unreadable"),
    }

    let app = create_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("tunebridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
