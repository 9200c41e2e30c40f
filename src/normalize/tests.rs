use super::*;
use serde_json::json;

fn track_payload(name: &str, artist: &str) -> String {
    json!({
        "is_playing": true,
        "progress_ms": 42000,
        "item": {
            "name": name,
            "artists": [{"name": artist}, {"name": "Featured"}],
            "album": {"name": "Album", "images": []}
        }
    })
    .to_string()
}

#[test]
fn test_no_content_is_idle_sentinel() {
    let view = normalize_track(&UpstreamResponse::new(204, ""), &Romanizer::default());
    assert_eq!(
        view,
        TrackView::Idle {
            status: NO_TRACK_PLAYING.to_string()
        }
    );
    assert_eq!(
        serde_json::to_value(&view).unwrap(),
        json!({"status": "no track playing"})
    );
}

#[test]
fn test_track_fields_extracted() {
    let response = UpstreamResponse::new(200, track_payload("Song 2", "Blur"));
    let view = normalize_track(&response, &Romanizer::default());

    assert_eq!(
        serde_json::to_value(&view).unwrap(),
        json!({"name": "Song 2", "artist": "Blur", "album": "Album", "is_playing": true})
    );
}

#[test]
fn test_hangul_track_name_is_romanized() {
    let response = UpstreamResponse::new(200, track_payload("좋은 날", "아이유"));
    let view = normalize_track(&response, &Romanizer::default());

    let TrackView::Playing(info) = view else {
        panic!("expected a playing view");
    };
    assert_eq!(info.name, "joeun nal");
    assert_eq!(info.artist, "aiyu");
    assert!(info.name.chars().all(|c| (c as u32) <= 0x7F));
}

#[test]
fn test_upstream_error_embeds_json_body() {
    let body = r#"{"error": {"status": 401, "message": "The access token expired"}}"#;
    let view = normalize_track(&UpstreamResponse::new(401, body), &Romanizer::default());

    let TrackView::Failed(err) = view else {
        panic!("expected an error view");
    };
    assert_eq!(err.upstream_status, Some(401));
    assert_eq!(err.error["error"]["message"], "The access token expired");
    assert_eq!(err.http_status(), 401);
}

#[test]
fn test_upstream_error_with_raw_text_body() {
    let view = normalize_track(
        &UpstreamResponse::new(502, "Bad Gateway from edge"),
        &Romanizer::default(),
    );

    assert_eq!(
        serde_json::to_value(&view).unwrap(),
        json!({"error": {"error_text": "Bad Gateway from edge"}, "upstream_status": 502})
    );
}

#[test]
fn test_missing_item_is_malformed_view() {
    let payload = json!({"is_playing": false, "item": null, "currently_playing_type": "ad"});
    let view = normalize_track(
        &UpstreamResponse::new(200, payload.to_string()),
        &Romanizer::default(),
    );

    let TrackView::Failed(err) = view else {
        panic!("expected an error view");
    };
    assert_eq!(err.error, json!(MALFORMED_PAYLOAD));
    assert_eq!(err.payload, Some(payload));
    assert_eq!(err.http_status(), 502);
}

#[test]
fn test_non_json_success_body_is_malformed_view() {
    let view = normalize_track(
        &UpstreamResponse::new(200, "<html>"),
        &Romanizer::default(),
    );
    let TrackView::Failed(err) = view else {
        panic!("expected an error view");
    };
    assert_eq!(err.payload, Some(json!({"error_text": "<html>"})));
}

#[test]
fn test_player_state_extracts_device_and_art() {
    let payload = json!({
        "device": {"id": "d1", "name": "Kitchen", "volume_percent": 35},
        "is_playing": true,
        "item": {
            "name": "x",
            "album": {"images": [
                {"url": "https://i.scdn.co/image/large", "height": 640},
                {"url": "https://i.scdn.co/image/small", "height": 64}
            ]}
        }
    });
    let view = normalize_player_state(
        &UpstreamResponse::new(200, payload.to_string()),
        &Romanizer::default(),
    );

    assert_eq!(
        view,
        PlayerStateView::Active(DeviceInfo {
            device: "Kitchen".to_string(),
            volume_percent: Some(35),
            image_url: Some("https://i.scdn.co/image/large".to_string()),
        })
    );
    assert_eq!(view.volume_percent(), Some(35));
}

#[test]
fn test_player_state_without_volume_or_images() {
    let payload = json!({"device": {"name": "TV", "volume_percent": null}});
    let view = normalize_player_state(
        &UpstreamResponse::new(200, payload.to_string()),
        &Romanizer::default(),
    );

    assert_eq!(
        serde_json::to_value(&view).unwrap(),
        json!({"device": "TV", "volume_percent": null})
    );
}

#[test]
fn test_player_state_no_content_and_missing_device() {
    let romanizer = Romanizer::default();

    let idle = normalize_player_state(&UpstreamResponse::new(204, ""), &romanizer);
    assert_eq!(
        serde_json::to_value(&idle).unwrap(),
        json!({"status": "no active device"})
    );

    let malformed = normalize_player_state(
        &UpstreamResponse::new(200, r#"{"is_playing": true}"#),
        &romanizer,
    );
    assert!(matches!(malformed, PlayerStateView::Failed(_)));
    assert_eq!(malformed.volume_percent(), None);
}

#[test]
fn test_now_playing_flattens_track_and_nests_player() {
    let view = normalize_now_playing(
        &UpstreamResponse::new(200, track_payload("Song 2", "Blur")),
        &UpstreamResponse::new(204, ""),
        &Romanizer::default(),
    );

    assert_eq!(view.http_status(), 200);
    assert_eq!(
        serde_json::to_value(&view).unwrap(),
        json!({
            "name": "Song 2",
            "artist": "Blur",
            "album": "Album",
            "is_playing": true,
            "player": {"status": "no active device"}
        })
    );
}

#[test]
fn test_now_playing_status_follows_track_error() {
    let view = normalize_now_playing(
        &UpstreamResponse::new(429, r#"{"error": {"status": 429}}"#),
        &UpstreamResponse::new(429, r#"{"error": {"status": 429}}"#),
        &Romanizer::default(),
    );
    assert_eq!(view.http_status(), 429);
}

#[test]
fn test_device_volume_picks_named_device() {
    let payload = json!({"devices": [
        {"id": "tv", "name": "TV", "volume_percent": 30, "is_active": true},
        {"id": "kitchen", "name": "Kitchen", "volume_percent": 70, "is_active": false},
        {"id": "car", "name": "Car", "volume_percent": null}
    ]});
    let response = UpstreamResponse::new(200, payload.to_string());

    assert_eq!(device_volume(&response, "kitchen"), Some(70));
    assert_eq!(device_volume(&response, "tv"), Some(30));
    assert_eq!(device_volume(&response, "car"), None);
    assert_eq!(device_volume(&response, "missing"), None);
    assert_eq!(device_volume(&UpstreamResponse::new(401, "{}"), "tv"), None);
}
