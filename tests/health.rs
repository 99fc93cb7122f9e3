mod common;

use axum::{extract::State, http::StatusCode};
use rental_client::{
    config::{AppConfig, ClientConfig},
    routes::health::{health_check, readiness},
    state::AppState,
};

fn app_config() -> AppConfig {
    AppConfig {
        client: ClientConfig::new("sqlite::memory:"),
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: "test-secret".to_string(),
        run_migrations: false,
    }
}

#[tokio::test]
async fn liveness_reports_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");
    assert_eq!(response.0.data.expect("health data").status, "ok");
}

#[tokio::test]
async fn readiness_follows_the_connection() {
    let client = common::client().await;
    let state = AppState::new(client.clone(), app_config());

    let (status, body) = readiness(State(state.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.0.data.expect("ready data").status, "ok");

    client.disconnect().await.expect("disconnect");
    let (status, body) = readiness(State(state)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body.0.data.expect("ready data").status, "unavailable");
}
