#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use glucowatch_api::app::build_router;
use glucowatch_api::config::ServerConfig;
use glucowatch_api::state::AppState;
use glucowatch_core::error::ProviderError;
use glucowatch_core::patient::ProviderCredentials;
use glucowatch_core::store::CredentialVerifier;
use glucowatch_dexcom::Region;
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        dexcom_region: Region::Ous,
        dexcom_timeout: Duration::from_secs(1),
    }
}

/// Accepts every login.
pub struct AcceptAll;

#[async_trait]
impl CredentialVerifier for AcceptAll {
    async fn verify_credentials(&self, _: &ProviderCredentials) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Build the application against a given pool.
pub fn build_app(pool: PgPool) -> Router {
    build_router(AppState {
        pool,
        config: Arc::new(test_config()),
        verifier: Arc::new(AcceptAll),
    })
}

/// Build the application against a pool that points at a closed port, so
/// any handler that reaches the database fails quickly. Used for the paths
/// that are decided before storage is touched.
pub fn build_test_app() -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy("postgres://glucowatch@127.0.0.1:1/glucowatch")
        .unwrap();
    build_app(pool)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
