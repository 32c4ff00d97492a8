//! Repository for the `alerts` table.

use glucowatch_core::alert::AlertDecision;
use sqlx::PgPool;

use crate::models::alert::AlertRow;

const COLUMNS: &str = "\
    id, patient_id, value, kind, severity, message, measured_at, decided_at, \
    is_acknowledged, acknowledged_at, created_at";

pub struct AlertRepo;

impl AlertRepo {
    /// Insert an unacknowledged alert row for a decision.
    pub async fn insert(pool: &PgPool, decision: &AlertDecision) -> Result<AlertRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts (patient_id, value, kind, severity, message, measured_at, decided_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(decision.patient_id)
            .bind(decision.value)
            .bind(decision.kind.as_str())
            .bind(decision.severity.as_str())
            .bind(&decision.message)
            .bind(decision.measured_at)
            .bind(decision.decided_at)
            .fetch_one(pool)
            .await
    }
}
