//! Webhook alert sink with bounded exponential-backoff retry.
//!
//! [`WebhookSink`] POSTs the JSON-encoded [`AlertDecision`] to an internal
//! HTTP endpoint. Failed attempts are retried twice (after 500 ms, then
//! 1 s). Client errors other than 408 and 429 are not retried.

use std::time::Duration;

use async_trait::async_trait;
use glucowatch_core::alert::AlertDecision;

use crate::delivery::{AlertSink, DeliveryError};

/// Delays before each retry.
const RETRY_DELAYS: [Duration; 2] = [Duration::from_millis(500), Duration::from_secs(1)];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_millis(2500);

/// Covers three attempts plus both backoff delays.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers alerts to an HTTP callback.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    retry_delays: Vec<Duration>,
}

impl WebhookSink {
    /// Create a sink with a pre-configured HTTP client.
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            retry_delays: RETRY_DELAYS.to_vec(),
        })
    }

    /// Reuse an existing [`reqwest::Client`]; its timeout applies per attempt.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            retry_delays: RETRY_DELAYS.to_vec(),
        }
    }

    /// Replace the backoff schedule. The number of delays is the number of
    /// retries.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, payload: &serde_json::Value) -> Result<(), DeliveryError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Whether another attempt could plausibly succeed.
fn is_retryable(e: &DeliveryError) -> bool {
    match e {
        DeliveryError::HttpStatus(status) => {
            !(400..500).contains(status) || matches!(*status, 408 | 429)
        }
        DeliveryError::Request(_) => true,
        _ => false,
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn kind(&self) -> &'static str {
        "webhook"
    }

    fn default_timeout(&self) -> Duration {
        SEND_TIMEOUT
    }

    async fn send(&self, alert: &AlertDecision) -> Result<(), DeliveryError> {
        let payload = serde_json::to_value(alert)?;

        let mut delays = self.retry_delays.iter();
        let mut attempt = 1;
        loop {
            let err = match self.try_send(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            match delays.next() {
                Some(delay) if is_retryable(&err) => {
                    tracing::warn!(
                        attempt,
                        url = %self.url,
                        error = %err,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                    attempt += 1;
                }
                _ => {
                    tracing::error!(attempt, url = %self.url, error = %err, "Webhook delivery failed");
                    return Err(err);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::Utc;
    use glucowatch_core::alert::{alert_message, AlertKind};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn decision() -> AlertDecision {
        let now = Utc::now();
        AlertDecision {
            patient_id: uuid::Uuid::new_v4(),
            value: 55,
            kind: AlertKind::Low,
            severity: AlertKind::Low.severity(),
            message: alert_message(AlertKind::Low, 55, 70),
            measured_at: now,
            decided_at: now,
        }
    }

    /// Minimal HTTP endpoint answering each request with the next status in
    /// `statuses` (the last one repeats). Returns its URL and a hit counter.
    async fn serve_statuses(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses[n.min(statuses.len() - 1)];

                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/alerts"), hits)
    }

    /// Read headers and a `content-length` body from the socket.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn fast_sink(url: String) -> WebhookSink {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap();
        WebhookSink::with_client(client, url)
            .with_retry_delays(vec![Duration::from_millis(5), Duration::from_millis(5)])
    }

    #[tokio::test]
    async fn delivers_on_first_success() {
        let (url, hits) = serve_statuses(vec![204]).await;
        fast_sink(url).send(&decision()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let (url, hits) = serve_statuses(vec![500, 503, 200]).await;
        fast_sink(url).send(&decision()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_bounded_retries() {
        let (url, hits) = serve_statuses(vec![502]).await;
        let result = fast_sink(url).send(&decision()).await;
        assert_matches!(result, Err(DeliveryError::HttpStatus(502)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (url, hits) = serve_statuses(vec![400]).await;
        let result = fast_sink(url).send(&decision()).await;
        assert_matches!(result, Err(DeliveryError::HttpStatus(400)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn throttling_is_retryable() {
        assert!(is_retryable(&DeliveryError::HttpStatus(429)));
        assert!(is_retryable(&DeliveryError::HttpStatus(500)));
        assert!(!is_retryable(&DeliveryError::HttpStatus(404)));
    }

    #[test]
    fn delivery_error_display_http_status() {
        assert_eq!(DeliveryError::HttpStatus(502).to_string(), "Sink returned HTTP 502");
    }
}
