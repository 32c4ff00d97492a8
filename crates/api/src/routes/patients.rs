//! Route definitions for per-patient endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::patients;
use crate::state::AppState;

/// Routes mounted at `/patients`.
///
/// ```text
/// POST /{id}/provider-credentials     -> link_provider_credentials
/// GET  /{id}/readings                 -> list_readings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/provider-credentials",
            post(patients::link_provider_credentials),
        )
        .route("/{id}/readings", get(patients::list_readings))
}
