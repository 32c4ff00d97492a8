//! REST client for the Dexcom Share endpoints.
//!
//! Wraps login and the latest-values query using [`reqwest`]. Session
//! reuse and error classification live in [`crate::client`].

use std::time::Duration;

use crate::messages::{
    AuthenticateRequest, LoginByIdRequest, RawGlucoseValue, ShareFault, NULL_SESSION_ID,
};
use crate::region::Region;

/// Default HTTP timeout for a single Share request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How far back the latest-values query looks.
const LOOKBACK_MINUTES: u32 = 10;

/// Fault codes that mean the session id is no longer usable.
const SESSION_FAULT_CODES: [&str; 2] = ["SessionIdNotFound", "SessionNotValid"];

/// Fault codes that mean the account credentials were rejected.
const AUTH_FAULT_CODES: [&str; 6] = [
    "AccountPasswordInvalid",
    "SSO_AuthenticateAccountNotFound",
    "SSO_AuthenticatePasswordInvalid",
    "SSO_AuthenticateMaxAttemptsExceeed",
    "SSO_AuthenticateMaxAttemptsExceeded",
    "AccountNotFound",
];

/// Errors from the Share REST layer.
#[derive(Debug, thiserror::Error)]
pub enum DexcomApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Share returned a non-2xx status.
    #[error("Dexcom Share error ({status}): {code} {message}")]
    Fault {
        status: u16,
        code: String,
        message: String,
    },

    /// Login succeeded at the HTTP level but produced the null session id.
    #[error("Dexcom Share returned an empty session")]
    NullSession,

    /// A 2xx response whose body could not be interpreted.
    #[error("Unexpected Dexcom Share response: {0}")]
    Decode(String),
}

impl DexcomApiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, DexcomApiError::Fault { code, .. } if SESSION_FAULT_CODES.contains(&code.as_str()))
    }

    pub fn is_auth_failure(&self) -> bool {
        match self {
            DexcomApiError::NullSession => true,
            DexcomApiError::Fault { code, message, .. } => {
                AUTH_FAULT_CODES.contains(&code.as_str())
                    || (code == "InvalidArgument"
                        && (message.contains("accountName") || message.contains("password")))
            }
            _ => false,
        }
    }
}

/// HTTP client for one Share region.
pub struct DexcomApi {
    client: reqwest::Client,
    region: Region,
}

impl DexcomApi {
    /// Create a client with its own connection pool and request timeout.
    pub fn new(region: Region, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, region })
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, region: Region) -> Self {
        Self { client, region }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Log in with account name and password, returning a session id.
    ///
    /// Share needs two calls: resolve the account id, then log in by id.
    pub async fn login(&self, account_name: &str, password: &str) -> Result<String, DexcomApiError> {
        let account_id: String = self
            .post_json(
                "General/AuthenticatePublisherAccount",
                &AuthenticateRequest {
                    account_name,
                    password,
                    application_id: self.region.application_id(),
                },
            )
            .await?;

        let session_id: String = self
            .post_json(
                "General/LoginPublisherAccountById",
                &LoginByIdRequest {
                    account_id: &account_id,
                    password,
                    application_id: self.region.application_id(),
                },
            )
            .await?;

        if session_id.is_empty() || session_id == NULL_SESSION_ID {
            return Err(DexcomApiError::NullSession);
        }
        Ok(session_id)
    }

    /// Fetch at most one reading from the last few minutes.
    pub async fn latest_glucose_value(
        &self,
        session_id: &str,
    ) -> Result<Option<RawGlucoseValue>, DexcomApiError> {
        let response = self
            .client
            .post(self.url("Publisher/ReadPublisherLatestGlucoseValues"))
            .query(&[
                ("sessionId", session_id.to_string()),
                ("minutes", LOOKBACK_MINUTES.to_string()),
                ("maxCount", "1".to_string()),
            ])
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let values: Vec<RawGlucoseValue> = Self::parse_response(response).await?;
        Ok(values.into_iter().next())
    }

    // ---- private helpers ----

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.region.base_url(), endpoint)
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, DexcomApiError>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self.client.post(self.url(endpoint)).json(body).send().await?;
        Self::parse_response(response).await
    }

    /// Turn a non-2xx response into [`DexcomApiError::Fault`], otherwise
    /// decode the JSON body.
    async fn parse_response<T>(response: reqwest::Response) -> Result<T, DexcomApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let fault = serde_json::from_str::<ShareFault>(&body).unwrap_or(ShareFault {
                code: String::new(),
                message: body,
            });
            return Err(DexcomApiError::Fault {
                status: status.as_u16(),
                code: fault.code,
                message: fault.message,
            });
        }

        serde_json::from_str(&body).map_err(|e| DexcomApiError::Decode(e.to_string()))
    }
}
