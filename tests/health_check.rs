//! Integration tests for the standalone refresh server

use std::net::TcpListener;
use std::sync::Arc;

use refresh_token::auth::InMemoryRefreshTokenStore;
use refresh_token::configuration::{
    ApplicationSettings, DatabaseSettings, EnvironmentSettings, JwtSettings, RefreshTokenSettings,
    Settings,
};
use refresh_token::startup::{build_middleware, run};

fn test_settings() -> Settings {
    Settings {
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "unused".to_string(),
        },
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        jwt: JwtSettings {
            secret: "test-access-secret-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            issuer: "test".to_string(),
        },
        refresh_token: RefreshTokenSettings {
            request_refresh_on_all: false,
            refresh_token_secret: "testSecretKey".to_string(),
            refresh_token_expires_in: "30d".to_string(),
            cookie_response: false,
        },
        environment: EnvironmentSettings::default(),
    }
}

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let server = run(listener, build_middleware(&test_settings(), store))
        .expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn refresh_with_invalid_token_returns_401() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .post(&format!("{}/api/auth/local/refresh", addr))
        .json(&serde_json::json!({ "refreshToken": "invalidToken" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(401, response.status().as_u16());
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Invalid Token");
}
