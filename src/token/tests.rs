use super::*;
use crate::credentials::MemoryBackend;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::time::Duration;

const BASIC_ID_SECRET: &str = "Basic SUQ6U0VDUkVU";

fn build_acquirer(accounts_url: String, record: Option<Value>) -> TokenAcquirer {
    let backend = match record {
        Some(record) => MemoryBackend::with_record(record),
        None => MemoryBackend::new(),
    };
    let store = Arc::new(CredentialStore::new(backend));
    let spotify = SpotifyConfig {
        accounts_url,
        ..SpotifyConfig::default()
    };
    let http = crate::upstream::build_http_client(Duration::from_secs(5)).unwrap();
    TokenAcquirer::new(store, http, &spotify)
}

fn token_body(access_token: &str, refresh_token: Option<&str>) -> String {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "user-read-playback-state user-modify-playback-state"
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
    }
    body.to_string()
}

async fn mock_grant(
    server: &mut ServerGuard,
    matchers: Vec<Matcher>,
    status: usize,
    body: &str,
    hits: usize,
) -> mockito::Mock {
    server
        .mock("POST", "/api/token")
        .match_header("authorization", BASIC_ID_SECRET)
        .match_body(Matcher::AllOf(matchers))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

fn refresh_matchers(token: &str) -> Vec<Matcher> {
    vec![
        Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
        Matcher::UrlEncoded("refresh_token".into(), token.into()),
    ]
}

fn code_matchers(code: &str) -> Vec<Matcher> {
    vec![
        Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
        Matcher::UrlEncoded("code".into(), code.into()),
        Matcher::UrlEncoded(
            "redirect_uri".into(),
            "http://localhost:8000/callback".into(),
        ),
    ]
}

#[tokio::test]
async fn test_missing_record_is_config_missing() {
    let acquirer = build_acquirer("http://127.0.0.1:1".to_string(), None);
    assert_eq!(acquirer.acquire().await, Err(BridgeError::ConfigMissing));
}

#[tokio::test]
async fn test_missing_secret_is_config_incomplete() {
    let acquirer = build_acquirer(
        "http://127.0.0.1:1".to_string(),
        Some(json!({"client_id": "ID", "refresh_token": "R"})),
    );
    assert_eq!(acquirer.acquire().await, Err(BridgeError::ConfigIncomplete));
}

#[tokio::test]
async fn test_no_code_or_refresh_token_is_no_material() {
    for record in [
        json!({"client_id": "ID", "client_secret": "SECRET"}),
        json!({"client_id": "ID", "client_secret": "SECRET", "code": ""}),
        json!({"client_id": "ID", "client_secret": "SECRET", "other": 1}),
    ] {
        let acquirer = build_acquirer("http://127.0.0.1:1".to_string(), Some(record));
        assert_eq!(
            acquirer.acquire().await,
            Err(BridgeError::NoCredentialMaterial)
        );
    }
}

#[tokio::test]
async fn test_refresh_grant_does_not_touch_store() {
    let mut server = Server::new_async().await;
    let mock = mock_grant(
        &mut server,
        refresh_matchers("R"),
        200,
        &token_body("A1", Some("R2")),
        1,
    )
    .await;

    let record = json!({"client_id": "ID", "client_secret": "SECRET", "refresh_token": "R"});
    let acquirer = build_acquirer(server.url(), Some(record));
    let before = acquirer.store().load().unwrap();

    let token = acquirer.acquire().await.unwrap();
    assert_eq!(token.access_token, "A1");
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, 3600);

    mock.assert_async().await;
    assert_eq!(acquirer.store().load().unwrap(), before);
}

#[tokio::test]
async fn test_refresh_token_wins_over_code() {
    let mut server = Server::new_async().await;
    let mock = mock_grant(
        &mut server,
        refresh_matchers("R"),
        200,
        &token_body("A1", None),
        1,
    )
    .await;

    let record = json!({
        "client_id": "ID",
        "client_secret": "SECRET",
        "refresh_token": "R",
        "code": "STALE"
    });
    let acquirer = build_acquirer(server.url(), Some(record));

    assert!(acquirer.acquire().await.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_refresh_failure_surfaces_json_body() {
    let mut server = Server::new_async().await;
    let _mock = mock_grant(
        &mut server,
        refresh_matchers("R"),
        400,
        r#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#,
        1,
    )
    .await;

    let record = json!({"client_id": "ID", "client_secret": "SECRET", "refresh_token": "R"});
    let acquirer = build_acquirer(server.url(), Some(record));

    match acquirer.acquire().await {
        Err(BridgeError::UpstreamTokenError { status, body }) => {
            assert_eq!(status, 400);
            assert_eq!(body["error"], "invalid_grant");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_failure_with_non_json_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/token")
        .with_status(503)
        .with_header("content-type", "text/html")
        .with_body("<html>upstream down</html>")
        .create_async()
        .await;

    let record = json!({"client_id": "ID", "client_secret": "SECRET", "refresh_token": "R"});
    let acquirer = build_acquirer(server.url(), Some(record));

    assert_eq!(
        acquirer.acquire().await,
        Err(BridgeError::UpstreamTokenError {
            status: 503,
            body: json!({"error_text": "<html>upstream down</html>"}),
        })
    );
}

#[tokio::test]
async fn test_success_with_non_json_body_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/token")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let record = json!({"client_id": "ID", "client_secret": "SECRET", "refresh_token": "R"});
    let acquirer = build_acquirer(server.url(), Some(record));

    assert_eq!(
        acquirer.acquire().await,
        Err(BridgeError::MalformedUpstreamPayload {
            body: json!({"error_text": "not json"}),
        })
    );
}

#[tokio::test]
async fn test_code_exchange_persists_refresh_token_and_drops_code() {
    let mut server = Server::new_async().await;
    let mock = mock_grant(
        &mut server,
        code_matchers("ABC"),
        200,
        &token_body("A1", Some("R1")),
        1,
    )
    .await;

    let record = json!({"client_id": "ID", "client_secret": "SECRET", "code": "ABC"});
    let acquirer = build_acquirer(server.url(), Some(record));

    let token = acquirer.acquire().await.unwrap();
    assert_eq!(token.access_token, "A1");
    mock.assert_async().await;

    let stored = acquirer.store().load().unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("R1"));
    assert!(stored.authorization_code.is_none());
    assert_eq!(stored.client_pair(), Some(("ID", "SECRET")));

    // Re-reading gives the same post-state
    assert_eq!(acquirer.store().load().unwrap().unwrap(), stored);
}

#[tokio::test]
async fn test_code_exchange_without_refresh_token_still_drops_code() {
    let mut server = Server::new_async().await;
    let _mock = mock_grant(
        &mut server,
        code_matchers("ABC"),
        200,
        &token_body("A1", None),
        1,
    )
    .await;

    let record = json!({"client_id": "ID", "client_secret": "SECRET", "code": "ABC"});
    let acquirer = build_acquirer(server.url(), Some(record));

    assert!(acquirer.acquire().await.is_ok());
    assert_eq!(
        acquirer.acquire().await,
        Err(BridgeError::NoCredentialMaterial)
    );
}

#[tokio::test]
async fn test_rejected_code_is_discarded_not_retried() {
    let mut server = Server::new_async().await;
    let mock = mock_grant(
        &mut server,
        code_matchers("ABC"),
        400,
        r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#,
        1,
    )
    .await;

    let record = json!({"client_id": "ID", "client_secret": "SECRET", "code": "ABC"});
    let acquirer = build_acquirer(server.url(), Some(record));

    assert!(matches!(
        acquirer.acquire().await,
        Err(BridgeError::UpstreamTokenError { status: 400, .. })
    ));
    assert_eq!(
        acquirer.acquire().await,
        Err(BridgeError::NoCredentialMaterial)
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_code_keeps_newer_code_from_callback() {
    let mut server = Server::new_async().await;
    let record = json!({"client_id": "ID", "client_secret": "SECRET", "code": "ABC"});
    let acquirer = build_acquirer(server.url(), Some(record));

    // A fresh /callback lands while the old code is being rejected
    let store = acquirer.store().clone();
    let _mock = server
        .mock("POST", "/api/token")
        .match_body(Matcher::AllOf(code_matchers("ABC")))
        .with_status(400)
        .with_body_from_request(move |_| {
            store.merge_and_save(json!({"code": "NEW"})).unwrap();
            br#"{"error":"invalid_grant"}"#.to_vec()
        })
        .create_async()
        .await;

    assert!(matches!(
        acquirer.acquire().await,
        Err(BridgeError::UpstreamTokenError { status: 400, .. })
    ));

    let stored = acquirer.store().load().unwrap().unwrap();
    assert_eq!(stored.authorization_code.as_deref(), Some("NEW"));
}

#[tokio::test]
async fn test_transport_failure_keeps_code() {
    let record = json!({"client_id": "ID", "client_secret": "SECRET", "code": "ABC"});
    let acquirer = build_acquirer("http://127.0.0.1:1".to_string(), Some(record));

    assert!(matches!(
        acquirer.acquire().await,
        Err(BridgeError::TokenTransport { .. })
    ));

    let stored = acquirer.store().load().unwrap().unwrap();
    assert_eq!(stored.authorization_code.as_deref(), Some("ABC"));
}

#[tokio::test]
async fn test_concurrent_requests_exchange_code_once() {
    let mut server = Server::new_async().await;
    let code_mock = mock_grant(
        &mut server,
        code_matchers("ABC"),
        200,
        &token_body("A1", Some("R1")),
        1,
    )
    .await;
    let refresh_mock = mock_grant(
        &mut server,
        refresh_matchers("R1"),
        200,
        &token_body("A2", None),
        1,
    )
    .await;

    let record = json!({"client_id": "ID", "client_secret": "SECRET", "code": "ABC"});
    let acquirer = build_acquirer(server.url(), Some(record));

    let (first, second) = tokio::join!(acquirer.acquire(), acquirer.acquire());
    let mut tokens = vec![first.unwrap().access_token, second.unwrap().access_token];
    tokens.sort();
    assert_eq!(tokens, vec!["A1".to_string(), "A2".to_string()]);

    code_mock.assert_async().await;
    refresh_mock.assert_async().await;
}
