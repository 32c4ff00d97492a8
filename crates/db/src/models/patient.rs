//! Patient rows joined with their clinical settings.

use glucowatch_core::error::CoreError;
use glucowatch_core::patient::{MonitoredPatient, ProviderCredentials};
use glucowatch_core::thresholds::ClinicalThresholds;
use glucowatch_core::types::{PatientId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `patients`. The provider password never leaves this crate
/// through serialization.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Patient {
    pub id: PatientId,
    pub email: String,
    pub provider_username: Option<String>,
    #[serde(skip_serializing)]
    pub provider_password: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Patient {
    /// Whether both provider credential columns are filled in.
    pub fn has_provider_credentials(&self) -> bool {
        ProviderCredentials::from_parts(
            self.provider_username.clone(),
            self.provider_password.clone(),
        )
        .is_some()
    }
}

/// A patient with credentials and optional thresholds (LEFT JOIN result).
#[derive(Debug, Clone, FromRow)]
pub struct EligiblePatientRow {
    pub id: PatientId,
    pub provider_username: Option<String>,
    pub provider_password: Option<String>,
    pub low_threshold: Option<i32>,
    pub high_threshold: Option<i32>,
}

impl EligiblePatientRow {
    /// Convert into the monitor's view.
    ///
    /// Returns `Ok(None)` when credentials are blank; the query only
    /// filters empty strings. A stored threshold
    /// pair violating `low < high` is an error.
    pub fn into_monitored(self) -> Result<Option<MonitoredPatient>, CoreError> {
        let Some(credentials) =
            ProviderCredentials::from_parts(self.provider_username, self.provider_password)
        else {
            return Ok(None);
        };

        let thresholds = match (self.low_threshold, self.high_threshold) {
            (Some(low), Some(high)) => Some(ClinicalThresholds::new(low, high)?),
            _ => None,
        };

        Ok(Some(MonitoredPatient {
            id: self.id,
            credentials,
            thresholds,
        }))
    }
}
