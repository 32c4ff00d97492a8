//! Persisted alert rows written by the database alert sink.

use glucowatch_core::types::{DbId, PatientId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertRow {
    pub id: DbId,
    pub patient_id: PatientId,
    pub value: i32,
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub measured_at: Timestamp,
    pub decided_at: Timestamp,
    pub is_acknowledged: bool,
    pub acknowledged_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
