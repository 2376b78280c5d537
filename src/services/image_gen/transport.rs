use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::errors::TransportError;
use super::models::ProxyRequest;

/// One outbound call to the generation proxy
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post the request and return the raw 2xx body
    async fn send(&self, request: &ProxyRequest) -> Result<String, TransportError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

#[cfg(feature = "reqwest")]
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts JSON to the proxy endpoint with reqwest
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "reqwest")]
impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[cfg(feature = "reqwest")]
fn network_error(error: reqwest::Error) -> TransportError {
    TransportError::from_reqwest_error(error, CONNECT_TIMEOUT.as_millis() as u64)
}

#[cfg(feature = "reqwest")]
#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ProxyRequest) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(network_error)?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Proxy returned error status");
            return Err(TransportError::from_status_and_body(status.as_u16(), &body));
        }

        Ok(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Runs a single transport call under a hard deadline and a caller's cancellation token.
///
/// Cancellation takes precedence and resolves to `Ok(None)`; the deadline expiring
/// is a retryable `TransportError::Timeout`. Dropping the in-flight future aborts
/// the underlying request.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    timeout: Duration,
}

impl TimeoutGuard {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn send<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: &ProxyRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, TransportError> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            result = tokio::time::timeout(self.timeout, transport.send(request)) => match result {
                Ok(Ok(body)) => Ok(Some(body)),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(TransportError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }),
            },
        }
    }
}
