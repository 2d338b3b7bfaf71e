// tests/auth_tests.rs

use chrono::{Days, Utc};
use lurkbot_core::platforms::twitch_helix::AppCredentialStore;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_response(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "access_token": token,
        "expires_in": 5_184_000,
        "token_type": "bearer",
    }))
}

fn store_for(server: &MockServer, dir: &TempDir) -> AppCredentialStore {
    AppCredentialStore::new(
        "cid".to_string(),
        "secret".to_string(),
        dir.path().join("last_token_update.txt"),
    )
    .unwrap()
    .with_id_base(server.uri())
}

#[tokio::test]
async fn missing_stamp_file_triggers_exactly_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(query_param("client_id", "cid"))
        .and(query_param("client_secret", "secret"))
        .and(query_param("grant_type", "client_credentials"))
        .respond_with(token_response("tok-1"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = store_for(&server, &dir);

    assert_eq!(store.ensure_token().await.as_deref(), Some("tok-1"));

    let stamp = std::fs::read_to_string(dir.path().join("last_token_update.txt")).unwrap();
    assert_eq!(stamp.trim(), Utc::now().format("%Y-%m-%d").to_string());
}

#[tokio::test]
async fn cached_token_with_fresh_stamp_skips_further_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(token_response("tok-1"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = store_for(&server, &dir);

    assert_eq!(store.ensure_token().await.as_deref(), Some("tok-1"));
    // Token is cached in memory and the stamp is from today: no new calls.
    assert_eq!(store.ensure_token().await.as_deref(), Some("tok-1"));
    assert_eq!(store.ensure_token().await.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn stale_stamp_forces_a_refresh_despite_a_cached_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(token_response("tok-1"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let stamp_path = dir.path().join("last_token_update.txt");
    let mut store = store_for(&server, &dir);

    assert!(store.ensure_token().await.is_some());

    // Backdate the stamp past the sixty-day window.
    let old = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(61))
        .unwrap();
    std::fs::write(&stamp_path, format!("{}\n", old.format("%Y-%m-%d"))).unwrap();

    assert!(store.ensure_token().await.is_some());
    let stamp = std::fs::read_to_string(&stamp_path).unwrap();
    assert_eq!(stamp.trim(), Utc::now().format("%Y-%m-%d").to_string());
}

#[tokio::test]
async fn failed_refresh_returns_no_token_and_writes_no_stamp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = store_for(&server, &dir);

    assert!(store.ensure_token().await.is_none());
    assert!(!dir.path().join("last_token_update.txt").exists());
}

#[tokio::test]
async fn refresh_recovers_once_the_endpoint_does() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut store = store_for(&server, &dir);

    {
        let _outage = Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount_as_scoped(&server)
            .await;
        assert!(store.ensure_token().await.is_none());
    }

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(token_response("tok-2"))
        .mount(&server)
        .await;

    assert_eq!(store.ensure_token().await.as_deref(), Some("tok-2"));
}
