//! Repository for the `glucose_readings` table (append-only time-series).

use glucowatch_core::glucose::NewGlucoseReading;
use glucowatch_core::types::PatientId;
use sqlx::{PgExecutor, PgPool};

use crate::models::glucose_reading::GlucoseReadingRow;

/// Column list for `glucose_readings` SELECT queries.
const COLUMNS: &str = "id, patient_id, value, trend, source, measured_at, recorded_at";

/// Provides query operations for glucose readings.
pub struct GlucoseReadingRepo;

impl GlucoseReadingRepo {
    /// Insert a single reading. `recorded_at` is set by the database.
    pub async fn insert<'e, E>(
        executor: E,
        reading: &NewGlucoseReading,
    ) -> Result<GlucoseReadingRow, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO glucose_readings (patient_id, value, trend, source, measured_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GlucoseReadingRow>(&query)
            .bind(reading.patient_id)
            .bind(reading.value)
            .bind(reading.trend.as_str())
            .bind(reading.source.as_str())
            .bind(reading.measured_at)
            .fetch_one(executor)
            .await
    }

    /// Most recent readings for a patient, newest first.
    pub async fn list_recent(
        pool: &PgPool,
        patient_id: PatientId,
        limit: i64,
    ) -> Result<Vec<GlucoseReadingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM glucose_readings \
             WHERE patient_id = $1 \
             ORDER BY measured_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, GlucoseReadingRow>(&query)
            .bind(patient_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
