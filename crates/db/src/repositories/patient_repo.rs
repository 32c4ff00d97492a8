//! Repository for `patients` and `patient_clinical_settings`.

use glucowatch_core::types::PatientId;
use sqlx::PgPool;

use crate::models::patient::{EligiblePatientRow, Patient};

/// Column list for `patients` SELECT queries.
const COLUMNS: &str = "\
    id, email, provider_username, provider_password, created_at, updated_at";

/// Provides query operations for patients.
pub struct PatientRepo;

impl PatientRepo {
    /// Find a patient by id.
    pub async fn find_by_id(pool: &PgPool, id: PatientId) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM patients WHERE id = $1");
        sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List patients with non-empty provider credentials, joined with their
    /// clinical settings when present.
    pub async fn list_eligible(pool: &PgPool) -> Result<Vec<EligiblePatientRow>, sqlx::Error> {
        sqlx::query_as::<_, EligiblePatientRow>(
            "SELECT p.id, p.provider_username, p.provider_password, \
                    s.low_threshold, s.high_threshold \
             FROM patients p \
             LEFT JOIN patient_clinical_settings s ON s.patient_id = p.id \
             WHERE p.provider_username IS NOT NULL AND p.provider_username <> '' \
               AND p.provider_password IS NOT NULL AND p.provider_password <> '' \
             ORDER BY p.created_at, p.id",
        )
        .fetch_all(pool)
        .await
    }

    /// Store provider credentials, but only if none are linked yet.
    ///
    /// Returns `false` when the patient already had credentials (or does
    /// not exist), leaving the row untouched.
    pub async fn link_provider_credentials(
        pool: &PgPool,
        id: PatientId,
        username: &str,
        password: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE patients \
             SET provider_username = $2, provider_password = $3, updated_at = NOW() \
             WHERE id = $1 \
               AND (provider_username IS NULL OR provider_username = '' \
                    OR provider_password IS NULL OR provider_password = '')",
        )
        .bind(id)
        .bind(username)
        .bind(password)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
