//! Shared test fixtures: in-memory pool, app state, request helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::Value;
use tower::ServiceExt;

use readgate::classify::UserAgentClassifier;
use readgate::config::Config;
use readgate::db::{self, AppState, DbPool};
use readgate::handlers;
use readgate::issuance;
use readgate::models::{IssueLicense, License};
use readgate::notify::Notifier;

pub const INTERNAL_TOKEN: &str = "test-internal-token";

pub fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        db::init_db(&conn).unwrap();
    }
    pool
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: ":memory:".to_string(),
        base_url: "http://localhost:3000".to_string(),
        default_max_devices: 2,
        category_device_limit: 2,
        internal_api_token: Some(INTERNAL_TOKEN.to_string()),
        resend_api_key: None,
        email_from: "no-reply@test.local".to_string(),
        notify_webhook_url: None,
        operator_email: None,
        dev_mode: true,
    }
}

pub fn create_test_state() -> AppState {
    let config = test_config();
    AppState {
        db: test_pool(),
        base_url: config.base_url.clone(),
        default_max_devices: config.default_max_devices,
        category_device_limit: config.category_device_limit,
        internal_api_token: config.internal_api_token.clone(),
        classifier: Arc::new(UserAgentClassifier::new()),
        notifier: Notifier::new(&config),
    }
}

pub fn app(state: AppState) -> Router {
    handlers::public_router()
        .merge(handlers::internal_router(state.clone()))
        .with_state(state)
}

/// Issue a license directly through the core, bypassing HTTP.
pub fn issue_test_license(state: &AppState, purchase_reference: &str) -> License {
    let conn = state.db.get().unwrap();
    issuance::issue_license(
        &conn,
        &IssueLicense {
            email: "reader@example.com".to_string(),
            customer_name: Some("Test Reader".to_string()),
            purchase_reference: purchase_reference.to_string(),
            amount_paid_cents: 1999,
            currency: "EUR".to_string(),
            max_devices: None,
        },
        state.default_max_devices,
    )
    .unwrap()
    .license
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        // Middleware rejections carry no body.
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response should be valid JSON")
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: Value,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Activate a device through the public endpoint and return the body.
pub async fn activate(app: &Router, code: &str, fingerprint: &str, device_type: &str) -> Value {
    let (status, body) = post_json(
        app,
        "/activate-device",
        serde_json::json!({
            "code": code,
            "fingerprint": fingerprint,
            "device_type": device_type,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}
