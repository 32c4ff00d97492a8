//! Session-caching Share client implementing the monitor's provider traits.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use glucowatch_core::error::ProviderError;
use glucowatch_core::glucose::ProviderReading;
use glucowatch_core::patient::ProviderCredentials;
use glucowatch_core::store::{CredentialVerifier, ReadingSource};
use tokio::sync::Mutex;

use crate::api::{DexcomApi, DexcomApiError};
use crate::region::Region;

/// A cached session, tied to the password it was created with so that a
/// changed password forces a fresh login.
struct CachedSession {
    password: String,
    session_id: String,
}

/// Dexcom Share reading source.
///
/// Session ids are cached per account name and reused across runs. When
/// Share reports the session expired, the client logs in again once and
/// retries the read.
pub struct DexcomClient {
    api: DexcomApi,
    sessions: Mutex<HashMap<String, CachedSession>>,
}

impl DexcomClient {
    pub fn new(region: Region, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::from_api(DexcomApi::new(region, timeout)?))
    }

    pub fn from_api(api: DexcomApi) -> Self {
        Self {
            api,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn region(&self) -> Region {
        self.api.region()
    }

    async fn cached_session(&self, credentials: &ProviderCredentials) -> Option<String> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&credentials.username)
            .filter(|s| s.password == credentials.password)
            .map(|s| s.session_id.clone())
    }

    async fn login(&self, credentials: &ProviderCredentials) -> Result<String, DexcomApiError> {
        let session_id = self
            .api
            .login(&credentials.username, &credentials.password)
            .await?;

        self.sessions.lock().await.insert(
            credentials.username.clone(),
            CachedSession {
                password: credentials.password.clone(),
                session_id: session_id.clone(),
            },
        );
        Ok(session_id)
    }

    async fn forget(&self, credentials: &ProviderCredentials) {
        self.sessions.lock().await.remove(&credentials.username);
    }

    async fn fetch(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Option<ProviderReading>, DexcomApiError> {
        let session_id = match self.cached_session(credentials).await {
            Some(id) => id,
            None => self.login(credentials).await?,
        };

        let raw = match self.api.latest_glucose_value(&session_id).await {
            Err(e) if e.is_session_expired() => {
                tracing::debug!(account = %credentials.username, "Dexcom session expired, logging in again");
                self.forget(credentials).await;
                let session_id = self.login(credentials).await?;
                self.api.latest_glucose_value(&session_id).await?
            }
            other => other?,
        };

        raw.map(|value| value.into_reading().map_err(DexcomApiError::Decode))
            .transpose()
    }
}

/// Map a Share failure onto the provider error taxonomy.
fn classify(e: DexcomApiError) -> ProviderError {
    if e.is_auth_failure() {
        ProviderError::Auth(e.to_string())
    } else {
        ProviderError::Unavailable(e.to_string())
    }
}

#[async_trait]
impl ReadingSource for DexcomClient {
    async fn fetch_current_reading(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Option<ProviderReading>, ProviderError> {
        match self.fetch(credentials).await {
            Ok(reading) => Ok(reading),
            Err(e) => {
                if e.is_auth_failure() {
                    // Do not keep reusing a session for rejected credentials.
                    self.forget(credentials).await;
                }
                Err(classify(e))
            }
        }
    }
}

#[async_trait]
impl CredentialVerifier for DexcomClient {
    async fn verify_credentials(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<(), ProviderError> {
        self.login(credentials).await.map(|_| ()).map_err(classify)
    }
}
