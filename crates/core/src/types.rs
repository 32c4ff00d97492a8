/// Patients are keyed by UUID, shared with the account service.
pub type PatientId = uuid::Uuid;

/// Readings and alerts use PostgreSQL BIGSERIAL keys.
pub type DbId = i64;

/// All persisted timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
