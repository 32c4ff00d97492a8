//! Interfaces the monitor consumes from its collaborators.
//!
//! Implementations live in other crates (`glucowatch-db` for storage,
//! `glucowatch-dexcom` for the provider). Tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::{PersistenceError, ProviderError};
use crate::glucose::{GlucoseReading, NewGlucoseReading, ProviderReading};
use crate::patient::{MonitoredPatient, ProviderCredentials};

/// Read-only view of patients and their thresholds.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Patients whose provider credentials are both present and non-empty.
    async fn list_eligible_patients(&self) -> Result<Vec<MonitoredPatient>, PersistenceError>;
}

/// Append-only reading storage.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist one reading as its own unit of work.
    async fn save_reading(
        &self,
        reading: &NewGlucoseReading,
    ) -> Result<GlucoseReading, PersistenceError>;
}

/// The external glucose-data provider.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Fetch the patient's latest reading; `Ok(None)` when there is none.
    async fn fetch_current_reading(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Option<ProviderReading>, ProviderError>;
}

/// Checks a login against the provider without fetching data.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify_credentials(&self, credentials: &ProviderCredentials)
        -> Result<(), ProviderError>;
}
