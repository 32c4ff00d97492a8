//! Database alert sink: writes each alert to the `alerts` table.

use std::time::Duration;

use async_trait::async_trait;
use glucowatch_core::alert::AlertDecision;
use glucowatch_db::repositories::AlertRepo;
use glucowatch_db::DbPool;

use crate::delivery::{AlertSink, DeliveryError};

/// Bound on a single alert insert.
const INSERT_TIMEOUT: Duration = Duration::from_secs(3);

/// Persists alerts as unacknowledged rows for downstream consumers.
///
/// The insert runs on its own pooled connection, after and outside any
/// reading transaction.
pub struct DatabaseSink {
    pool: DbPool,
}

impl DatabaseSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertSink for DatabaseSink {
    fn kind(&self) -> &'static str {
        "database"
    }

    fn default_timeout(&self) -> Duration {
        INSERT_TIMEOUT
    }

    async fn send(&self, alert: &AlertDecision) -> Result<(), DeliveryError> {
        let row = AlertRepo::insert(&self.pool, alert).await?;
        tracing::debug!(alert_id = row.id, patient_id = %alert.patient_id, "Alert row written");
        Ok(())
    }
}
