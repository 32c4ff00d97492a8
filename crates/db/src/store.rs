//! [`PgStore`]: the PostgreSQL implementation of the monitor's store traits.

use async_trait::async_trait;
use glucowatch_core::error::PersistenceError;
use glucowatch_core::glucose::{GlucoseReading, NewGlucoseReading};
use glucowatch_core::patient::MonitoredPatient;
use glucowatch_core::store::{PatientStore, ReadingStore};

use crate::repositories::{GlucoseReadingRepo, PatientRepo};
use crate::DbPool;

/// Patient and reading storage backed by a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn persistence_error(e: sqlx::Error) -> PersistenceError {
    PersistenceError::new(e.to_string())
}

#[async_trait]
impl PatientStore for PgStore {
    async fn list_eligible_patients(&self) -> Result<Vec<MonitoredPatient>, PersistenceError> {
        let rows = PatientRepo::list_eligible(&self.pool)
            .await
            .map_err(persistence_error)?;

        let mut patients = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match row.into_monitored() {
                Ok(Some(patient)) => patients.push(patient),
                Ok(None) => {}
                Err(e) => {
                    // Bad settings for one patient must not hide the rest.
                    tracing::error!(patient_id = %id, error = %e, "Skipping patient with invalid thresholds");
                }
            }
        }
        Ok(patients)
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    /// Insert inside a dedicated transaction so each patient's reading is
    /// committed independently of every other patient's.
    async fn save_reading(
        &self,
        reading: &NewGlucoseReading,
    ) -> Result<GlucoseReading, PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(persistence_error)?;
        let row = GlucoseReadingRepo::insert(&mut *tx, reading)
            .await
            .map_err(persistence_error)?;
        tx.commit().await.map_err(persistence_error)?;

        GlucoseReading::try_from(row).map_err(|e| PersistenceError::new(e.to_string()))
    }
}
