//! HTTP transport: one POST per request.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::schema::ClientConfig;
use crate::error::{Error, TransportError};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::transport::{parse_inbound, Inbound, RpcRequest};

/// Longest error body echoed back in a [`TransportError::Http`].
const MAX_ERROR_BODY: usize = 256;

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub url: String,
    pub connect_timeout: Duration,
    /// Total attempts for a request that fails before reaching the node.
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl HttpOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            max_attempts: 1,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2_000,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            url: config.node.url.clone(),
            connect_timeout: Duration::from_millis(config.node.connect_timeout_ms),
            max_attempts: config.retry.max_attempts,
            retry_base_delay_ms: config.retry.base_delay_ms,
            retry_max_delay_ms: config.retry.max_delay_ms,
        }
    }
}

/// Stateless request/response transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    options: HttpOptions,
    in_flight: Arc<AtomicUsize>,
}

/// Counts a request as in flight until dropped, whichever way it ends.
struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl InFlightGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

impl HttpTransport {
    pub fn new(options: HttpOptions) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(TransportError::http)?;
        Ok(Self {
            client,
            options,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Requests currently on the wire.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// POST the request; `timeout` covers every retry.
    pub async fn send(
        &self,
        request: RpcRequest,
        timeout: Option<Duration>,
    ) -> Result<Value, Error> {
        let _guard = InFlightGuard::new(&self.in_flight);
        let id = request.id;

        match timeout {
            Some(after) => {
                match tokio::time::timeout(after, self.send_with_retry(&request)).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::debug!(id, ?after, "http request timed out");
                        metrics::record_timeout();
                        Err(TransportError::Timeout { id, after }.into())
                    }
                }
            }
            None => self.send_with_retry(&request).await,
        }
    }

    /// Only failures to connect are retried; once the node may have seen
    /// the request a second POST could apply it twice.
    async fn send_with_retry(&self, request: &RpcRequest) -> Result<Value, Error> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(request).await {
                Err(Error::Transport(error))
                    if error.is_unsent() && attempt < max_attempts =>
                {
                    let delay = calculate_backoff(
                        attempt,
                        self.options.retry_base_delay_ms,
                        self.options.retry_max_delay_ms,
                    );
                    tracing::warn!(
                        id = request.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "http request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once(&self, request: &RpcRequest) -> Result<Value, Error> {
        let response = self
            .client
            .post(&self.options.url)
            .json(request)
            .send()
            .await
            .map_err(TransportError::http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.chars().take(MAX_ERROR_BODY).collect()
            };
            return Err(TransportError::Http {
                status: Some(status.as_u16()),
                message,
                connect: false,
                source: None,
            }
            .into());
        }

        let body = response.text().await.map_err(TransportError::http)?;
        match parse_inbound(&body)? {
            Inbound::Response { id, outcome } if id == request.id => outcome.map_err(Error::from),
            Inbound::Response { id, .. } => Err(TransportError::Message(format!(
                "response id {id} does not match request {}",
                request.id
            ))
            .into()),
            Inbound::Notice(_) => {
                Err(TransportError::Message("unexpected notice over http".to_string()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let _a = InFlightGuard::new(&counter);
            let _b = InFlightGuard::new(&counter);
            assert_eq!(counter.load(Ordering::Relaxed), 2);
        }
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = ClientConfig::default();
        config.node.url = "http://127.0.0.1:8090".to_string();
        config.retry.max_attempts = 4;
        let options = HttpOptions::from_config(&config);
        assert_eq!(options.url, "http://127.0.0.1:8090");
        assert_eq!(options.max_attempts, 4);
        assert_eq!(
            options.connect_timeout,
            Duration::from_millis(config.node.connect_timeout_ms)
        );
    }
}
