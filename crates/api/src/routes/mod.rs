pub mod health;
pub mod patients;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /patients/{id}/provider-credentials    link provider login (POST)
/// /patients/{id}/readings                recent readings (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/patients", patients::router())
}
