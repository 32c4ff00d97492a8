use std::sync::Arc;

use glucowatch_core::store::CredentialVerifier;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool and everything else is reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: glucowatch_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Checks provider logins before they are stored.
    pub verifier: Arc<dyn CredentialVerifier>,
}
