#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by the external glucose-data provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider rejected the patient's credentials.
    #[error("Provider authentication failed: {0}")]
    Auth(String),

    /// Timeout, network failure, or a server-side error at the provider.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// A storage write or read failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Persistence failed: {0}")]
pub struct PersistenceError(pub String);

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
