//! Client-facing views of Spotify player payloads.
//!
//! Upstream statuses map to views, never to errors:
//! - 204 → idle sentinel (`"no track playing"` / `"no active device"`)
//! - non-2xx → error view embedding the decoded upstream body
//! - 200 with missing fields → error view echoing the raw payload

pub mod translit;

#[cfg(test)]
mod tests;

pub use translit::{Romanized, Romanizer, Strategy, Transliterator};

use crate::error::BridgeError;
use crate::upstream::UpstreamResponse;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

pub const NO_TRACK_PLAYING: &str = "no track playing";
pub const NO_ACTIVE_DEVICE: &str = "no active device";
pub const MALFORMED_PAYLOAD: &str = "malformed upstream payload";

/// Error-carrying view
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorView {
    pub error: Value,
    /// Status of the failed upstream call; absent for malformed payloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// Raw payload that could not be reshaped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ErrorView {
    fn upstream(response: &UpstreamResponse) -> Self {
        Self::from(response.call_error())
    }

    fn malformed(payload: Value) -> Self {
        Self {
            error: Value::String(MALFORMED_PAYLOAD.to_string()),
            upstream_status: None,
            payload: Some(payload),
        }
    }

    /// HTTP status to report for this view.
    pub fn http_status(&self) -> u16 {
        self.upstream_status.unwrap_or(502)
    }
}

impl From<BridgeError> for ErrorView {
    fn from(err: BridgeError) -> Self {
        let upstream_status = match &err {
            BridgeError::UpstreamCallError { status, .. } => Some(*status),
            _ => None,
        };
        Self {
            error: err.detail(),
            upstream_status,
            payload: None,
        }
    }
}

/// Currently playing track
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackInfo {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub is_playing: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrackView {
    Playing(TrackInfo),
    Idle { status: String },
    Failed(ErrorView),
}

/// Active playback device
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub device: String,
    pub volume_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlayerStateView {
    Active(DeviceInfo),
    Idle { status: String },
    Failed(ErrorView),
}

impl PlayerStateView {
    /// Current volume, when a device is active and reports one.
    pub fn volume_percent(&self) -> Option<u8> {
        match self {
            PlayerStateView::Active(info) => info.volume_percent,
            _ => None,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            PlayerStateView::Failed(err) => err.http_status(),
            _ => 200,
        }
    }
}

/// Combined `/now-playing` view: track fields at the top level, player
/// state nested under `player`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NowPlayingView {
    #[serde(flatten)]
    pub track: TrackView,
    pub player: PlayerStateView,
}

impl NowPlayingView {
    /// The track view decides the status; player-state problems stay inside
    /// the nested view.
    pub fn http_status(&self) -> u16 {
        match &self.track {
            TrackView::Failed(err) => err.http_status(),
            _ => 200,
        }
    }
}

/// Normalize a `GET /me/player/currently-playing` response.
pub fn normalize_track(response: &UpstreamResponse, romanizer: &Romanizer) -> TrackView {
    match response.status {
        204 => TrackView::Idle {
            status: NO_TRACK_PLAYING.to_string(),
        },
        200 => {
            let payload = response.decoded_body();
            match extract_track(&payload) {
                Some(info) => TrackView::Playing(TrackInfo {
                    name: romanizer.romanize_text(&info.name),
                    artist: romanizer.romanize_text(&info.artist),
                    album: romanizer.romanize_text(&info.album),
                    is_playing: info.is_playing,
                }),
                None => {
                    warn!("Currently-playing payload is missing expected fields");
                    TrackView::Failed(ErrorView::malformed(payload))
                }
            }
        }
        _ => TrackView::Failed(ErrorView::upstream(response)),
    }
}

/// Normalize a `GET /me/player` response.
pub fn normalize_player_state(
    response: &UpstreamResponse,
    romanizer: &Romanizer,
) -> PlayerStateView {
    match response.status {
        204 => PlayerStateView::Idle {
            status: NO_ACTIVE_DEVICE.to_string(),
        },
        200 => {
            let payload = response.decoded_body();
            match extract_device(&payload) {
                Some(info) => PlayerStateView::Active(DeviceInfo {
                    device: romanizer.romanize_text(&info.device),
                    ..info
                }),
                None => {
                    warn!("Player-state payload is missing expected fields");
                    PlayerStateView::Failed(ErrorView::malformed(payload))
                }
            }
        }
        _ => PlayerStateView::Failed(ErrorView::upstream(response)),
    }
}

pub fn normalize_now_playing(
    track: &UpstreamResponse,
    player: &UpstreamResponse,
    romanizer: &Romanizer,
) -> NowPlayingView {
    NowPlayingView {
        track: normalize_track(track, romanizer),
        player: normalize_player_state(player, romanizer),
    }
}

/// Volume of the device with `device_id` in a `GET /me/player/devices` response.
pub fn device_volume(response: &UpstreamResponse, device_id: &str) -> Option<u8> {
    if response.status != 200 {
        return None;
    }
    response
        .decoded_body()
        .get("devices")?
        .as_array()?
        .iter()
        .find(|device| device.get("id").and_then(Value::as_str) == Some(device_id))?
        .get("volume_percent")?
        .as_u64()
        .map(|v| v.min(100) as u8)
}

fn extract_track(payload: &Value) -> Option<TrackInfo> {
    let item = payload.get("item")?;
    let artist = item
        .get("artists")?
        .as_array()?
        .first()?
        .get("name")?
        .as_str()?;

    Some(TrackInfo {
        name: item.get("name")?.as_str()?.to_string(),
        artist: artist.to_string(),
        album: item.get("album")?.get("name")?.as_str()?.to_string(),
        is_playing: payload.get("is_playing")?.as_bool()?,
    })
}

fn extract_device(payload: &Value) -> Option<DeviceInfo> {
    let device = payload.get("device")?;
    let name = device.get("name")?.as_str()?;

    // Volume is null for devices without volume control
    let volume_percent = device
        .get("volume_percent")
        .and_then(Value::as_u64)
        .map(|v| v.min(100) as u8);

    let image_url = payload
        .pointer("/item/album/images")
        .and_then(Value::as_array)
        .and_then(|images| images.iter().find_map(|img| img.get("url")?.as_str()))
        .map(str::to_string);

    Some(DeviceInfo {
        device: name.to_string(),
        volume_percent,
        image_url,
    })
}
