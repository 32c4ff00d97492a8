//! Patients as seen by the monitor: identity, provider login, thresholds.

use std::fmt;

use crate::thresholds::ClinicalThresholds;
use crate::types::PatientId;

/// Login for the external glucose-data provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub username: String,
    pub password: String,
}

impl ProviderCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Build credentials from nullable storage columns.
    ///
    /// Returns `None` unless both parts are present and non-blank.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.trim().is_empty() && !p.trim().is_empty() => {
                Some(Self::new(u, p))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A patient eligible for polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredPatient {
    pub id: PatientId,
    pub credentials: ProviderCredentials,
    /// `None` means the configured defaults apply.
    pub thresholds: Option<ClinicalThresholds>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_password() {
        let creds = ProviderCredentials::new("pat@example.com", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("pat@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn from_parts_requires_both_non_blank() {
        assert!(ProviderCredentials::from_parts(Some("a".into()), Some("b".into())).is_some());
        assert!(ProviderCredentials::from_parts(Some("a".into()), None).is_none());
        assert!(ProviderCredentials::from_parts(None, Some("b".into())).is_none());
        assert!(ProviderCredentials::from_parts(Some("".into()), Some("b".into())).is_none());
        assert!(ProviderCredentials::from_parts(Some("a".into()), Some("  ".into())).is_none());
    }
}
