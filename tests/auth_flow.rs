use std::net::TcpListener;
use std::sync::Arc;

use libris::auth::{decode_token, issue_token, issue_token_with_expiry, MemoryBlocklist, TokenKind};
use libris::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, RedisSettings, RevocationSettings, Settings,
};
use libris::startup::run;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub settings: Settings,
}

fn test_settings(port: u16) -> Settings {
    Settings {
        application: ApplicationSettings { port },
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "127.0.0.1".to_string(),
            database_name: "libris_test".to_string(),
        },
        jwt: JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            algorithm: "HS256".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 172800,
            issuer: "libris-test".to_string(),
        },
        redis: RedisSettings {
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
        },
        revocation: RevocationSettings { enabled: true },
    }
}

/// Spawns the app with an in-memory blocklist and a lazy database pool,
/// so the token endpoints run without any external services.
fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let settings = test_settings(port);
    let connection_pool = PgPoolOptions::new()
        .connect_lazy(&settings.database.connection_string())
        .expect("Failed to create lazy connection pool");

    let blocklist = Arc::new(MemoryBlocklist::new(settings.jwt.access_token_expiry));

    let server = run(listener, connection_pool, settings.clone(), blocklist)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp { address, settings }
}

async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse error body");
    body["code"].as_str().expect("missing error code").to_string()
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/health_check", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn refresh_with_refresh_token_returns_new_access_token() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    let refresh_token = issue_token(&user_id, "john@example.com", TokenKind::Refresh, &app.settings.jwt)
        .expect("Failed to issue refresh token");
    let refresh_claims = decode_token(&refresh_token, &app.settings.jwt).unwrap();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    let access_token = body["access_token"].as_str().expect("missing access_token");
    assert_eq!(body["token_type"], "Bearer");

    let claims = decode_token(access_token, &app.settings.jwt).expect("new token should decode");
    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.email, "john@example.com");
    assert!(!claims.refresh);
    assert_ne!(claims.jti, refresh_claims.jti);
}

#[tokio::test]
async fn refresh_with_access_token_returns_wrong_token_kind() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    let access_token = issue_token(&user_id, "john@example.com", TokenKind::Access, &app.settings.jwt)
        .expect("Failed to issue access token");

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
    assert_eq!(error_code(response).await, "WRONG_TOKEN_KIND");
}

#[tokio::test]
async fn logout_with_refresh_token_returns_wrong_token_kind() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    let refresh_token = issue_token(&user_id, "john@example.com", TokenKind::Refresh, &app.settings.jwt)
        .expect("Failed to issue refresh token");

    let response = client
        .post(&format!("{}/auth/logout", &app.address))
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
    assert_eq!(error_code(response).await, "WRONG_TOKEN_KIND");
}

#[tokio::test]
async fn missing_authorization_header_returns_missing_credential() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    for path in ["/auth/refresh", "/auth/logout"] {
        let response = client
            .post(&format!("{}{}", &app.address, path))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(403, response.status().as_u16(), "path {}", path);
        assert_eq!(error_code(response).await, "MISSING_CREDENTIAL");
    }

    let response = client
        .get(&format!("{}/api/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn garbage_token_returns_token_invalid() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", "Bearer not.a.jwt")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");
}

#[tokio::test]
async fn expired_token_returns_token_invalid() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    // Lapsed only seconds ago; the decoder grants no grace window.
    let expired = issue_token_with_expiry(
        &user_id,
        "john@example.com",
        TokenKind::Refresh,
        -30,
        &app.settings.jwt,
    )
    .expect("Failed to issue token");

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", expired))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");
}

#[tokio::test]
async fn logout_revokes_token_for_subsequent_requests() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    let access_token = issue_token(&user_id, "john@example.com", TokenKind::Access, &app.settings.jwt)
        .expect("Failed to issue access token");

    // Logout succeeds once the token validates.
    let response = client
        .post(&format!("{}/auth/logout", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    // Replay against a protected endpoint is rejected as revoked.
    let response = client
        .get(&format!("{}/api/me", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_REVOKED");

    // A second logout with the revoked token is rejected too.
    let response = client
        .post(&format!("{}/auth/logout", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_REVOKED");
}
