use super::BridgeAppState;
use crate::error::BridgeError;
use crate::normalize::{device_volume, normalize_now_playing, normalize_player_state};
use crate::proxy::{PlaybackCommand, CURRENTLY_PLAYING, DEVICES, PLAYER};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_VOLUME: i32 = 10;
const DEFAULT_STEP: i32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct DeviceParams {
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VolumeParams {
    pub device_id: Option<String>,
    #[serde(default = "default_volume")]
    pub volume_percent: i32,
}

#[derive(Debug, Deserialize)]
pub struct StepParams {
    pub device_id: Option<String>,
    #[serde(default = "default_step")]
    pub step: i32,
}

fn default_volume() -> i32 {
    DEFAULT_VOLUME
}

fn default_step() -> i32 {
    DEFAULT_STEP
}

pub fn create_playback_router(state: Arc<BridgeAppState>) -> Router {
    Router::new()
        .route("/now-playing", get(now_playing))
        .route("/player-state", get(player_state))
        .route("/pause", get(pause))
        .route("/play", get(play))
        .route("/next", get(next))
        .route("/previous", get(previous))
        .route("/volume", get(volume))
        .route("/volume-up", get(volume_up))
        .route("/volume-down", get(volume_down))
        .with_state(state)
}

/// GET /now-playing - track fields plus nested player state
async fn now_playing(State(state): State<Arc<BridgeAppState>>) -> Result<Response, BridgeError> {
    let (track, player) = tokio::join!(
        state.proxy.get(CURRENTLY_PLAYING),
        state.proxy.get(PLAYER)
    );
    let view = normalize_now_playing(&track?, &player?, &state.romanizer);
    Ok(view_response(view.http_status(), &view))
}

/// GET /player-state
async fn player_state(State(state): State<Arc<BridgeAppState>>) -> Result<Response, BridgeError> {
    let response = state.proxy.get(PLAYER).await?;
    let view = normalize_player_state(&response, &state.romanizer);
    Ok(view_response(view.http_status(), &view))
}

async fn pause(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<DeviceParams>,
) -> Result<Json<Value>, BridgeError> {
    send_command(&state, PlaybackCommand::Pause, params.device_id.as_deref(), &[]).await
}

async fn play(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<DeviceParams>,
) -> Result<Json<Value>, BridgeError> {
    send_command(&state, PlaybackCommand::Play, params.device_id.as_deref(), &[]).await
}

async fn next(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<DeviceParams>,
) -> Result<Json<Value>, BridgeError> {
    send_command(&state, PlaybackCommand::Next, params.device_id.as_deref(), &[]).await
}

async fn previous(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<DeviceParams>,
) -> Result<Json<Value>, BridgeError> {
    send_command(&state, PlaybackCommand::Previous, params.device_id.as_deref(), &[]).await
}

/// GET /volume?volume_percent=N (clamped to 0..=100)
async fn volume(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<VolumeParams>,
) -> Result<Json<Value>, BridgeError> {
    let level = clamp_volume(params.volume_percent);
    send_command(
        &state,
        PlaybackCommand::Volume,
        params.device_id.as_deref(),
        &[("volume_percent", level.to_string())],
    )
    .await
}

async fn volume_up(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<StepParams>,
) -> Result<Json<Value>, BridgeError> {
    step_volume(&state, params.device_id.as_deref(), params.step).await
}

async fn volume_down(
    State(state): State<Arc<BridgeAppState>>,
    Query(params): Query<StepParams>,
) -> Result<Json<Value>, BridgeError> {
    step_volume(&state, params.device_id.as_deref(), params.step.saturating_neg()).await
}

async fn send_command(
    state: &BridgeAppState,
    command: PlaybackCommand,
    device_id: Option<&str>,
    query: &[(&str, String)],
) -> Result<Json<Value>, BridgeError> {
    let status = state.proxy.command(command, device_id, query).await?;
    info!(?command, status, "Playback command forwarded");
    Ok(Json(json!({ "status": status })))
}

/// Read the current volume, shift it by `delta` and write it back.
///
/// The level is read from the named device when `device_id` is given,
/// otherwise from the active one.
async fn step_volume(
    state: &BridgeAppState,
    device_id: Option<&str>,
    delta: i32,
) -> Result<Json<Value>, BridgeError> {
    let device_id = device_id.filter(|id| !id.is_empty());
    let (response, current) = match device_id {
        Some(id) => {
            let response = state.proxy.get(DEVICES).await?;
            let current = device_volume(&response, id);
            (response, current)
        }
        None => {
            let response = state.proxy.get(PLAYER).await?;
            let current = normalize_player_state(&response, &state.romanizer).volume_percent();
            (response, current)
        }
    };

    let Some(current) = current else {
        debug!(status = response.status, "No adjustable volume on target device");
        return Ok(Json(json!({ "status": response.status })));
    };

    let target = clamp_volume(i32::from(current).saturating_add(delta));
    let status = state
        .proxy
        .command(
            PlaybackCommand::Volume,
            device_id,
            &[("volume_percent", target.to_string())],
        )
        .await?;

    info!(from = current, to = target, status, "Volume stepped");
    Ok(Json(json!({ "status": status, "volume_percent": target })))
}

fn clamp_volume(level: i32) -> u8 {
    level.clamp(0, 100) as u8
}

fn view_response<T: Serialize>(status: u16, view: &T) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(view)).into_response()
}
