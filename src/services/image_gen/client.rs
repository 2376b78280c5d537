use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::errors::GenerationError;
use super::limiter::ConcurrencyLimiter;
use super::models::GenerationRequest;
use super::retry::{RetryConfig, RetryHandler, RetryOutcome};
use super::transport::{TimeoutGuard, Transport};
use super::validator;
use crate::models::image::GeneratedImage;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/api/proxy";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub max_concurrent: usize,
    pub retry: RetryConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_millis(123_333),
            max_concurrent: 2,
            retry: RetryConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        let fail = |message: &str| {
            Err(GenerationError::Configuration {
                message: message.to_string(),
            })
        };

        if self.endpoint.trim().is_empty() {
            return fail("Endpoint cannot be empty");
        }
        if self.model.trim().is_empty() {
            return fail("Model name cannot be empty");
        }
        if self.timeout.is_zero() {
            return fail("Timeout must be greater than zero");
        }
        if self.max_concurrent == 0 {
            return fail("max_concurrent must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            return fail("max_attempts must be at least 1");
        }
        Ok(())
    }
}

/// Bounded, retrying client for the image generation proxy
#[derive(Clone)]
pub struct ImageGenerator {
    config: GeneratorConfig,
    transport: Arc<dyn Transport>,
    limiter: ConcurrencyLimiter,
    guard: TimeoutGuard,
}

impl ImageGenerator {
    /// Build a generator posting to `config.endpoint` with its own limiter
    #[cfg(feature = "reqwest")]
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        let transport = super::transport::HttpTransport::new(config.endpoint.clone()).map_err(
            |e| GenerationError::Configuration {
                message: e.to_string(),
            },
        )?;
        let limiter = ConcurrencyLimiter::new(config.max_concurrent);
        Self::with_transport(config, Arc::new(transport), limiter)
    }

    /// Build a generator around an existing transport and limiter.
    ///
    /// Generators sharing a limiter share its slots, whatever their own
    /// `max_concurrent` says.
    pub fn with_transport(
        config: GeneratorConfig,
        transport: Arc<dyn Transport>,
        limiter: ConcurrencyLimiter,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        let guard = TimeoutGuard::new(config.timeout);
        Ok(Self {
            config,
            transport,
            limiter,
            guard,
        })
    }

    /// Generate an image. `Ok(None)` means the request was cancelled; a closed
    /// limiter fails with `GenerationError::LimiterClosed`.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<Option<GeneratedImage>, GenerationError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "generate",
            request_id = %request_id,
            model = %request.model,
            transport = self.transport.name(),
        );
        self.limiter
            .run(self.generate_admitted(request))
            .instrument(span)
            .await?
    }

    /// Convenience wrapper filling in the configured model
    pub async fn generate_prompt(
        &self,
        prompt: impl Into<String>,
        cancel: Option<CancellationToken>,
    ) -> Result<Option<GeneratedImage>, GenerationError> {
        let mut request = GenerationRequest::new(self.config.model.clone(), prompt);
        request.cancellation = cancel;
        self.generate(request).await
    }

    async fn generate_admitted(
        &self,
        request: GenerationRequest,
    ) -> Result<Option<GeneratedImage>, GenerationError> {
        let started = Instant::now();
        let cancel = request.cancellation.clone().unwrap_or_default();
        let body = request.to_proxy_request();

        tracing::debug!(
            in_flight = self.limiter.in_flight(),
            has_image = request.image.is_some(),
            "Admitted generation request"
        );

        let mut handler = RetryHandler::new(self.config.retry.clone());
        let result = handler
            .retry(&cancel, |attempt| {
                let body = &body;
                let cancel = &cancel;
                async move {
                    tracing::debug!(attempt, "Sending generation attempt");
                    let sent = self.guard.send(self.transport.as_ref(), body, cancel).await;
                    let outcome: Result<Option<GeneratedImage>, GenerationError> = match sent {
                        Ok(Some(body)) => validator::validate_body(&body)
                            .map(Some)
                            .map_err(GenerationError::from),
                        Ok(None) => Ok(None),
                        Err(e) => Err(GenerationError::from(e)),
                    };
                    outcome
                }
            })
            .await;

        let metrics = handler.metrics();
        let duration_ms = started.elapsed().as_millis() as u64;
        let retry_ms = metrics.elapsed.as_millis() as u64;
        let backoff_ms = metrics.total_delay.as_millis() as u64;
        let outcome = metrics.outcome.map(RetryOutcome::as_str).unwrap_or("unknown");
        match &result {
            Ok(Some(_)) => tracing::info!(
                attempts = metrics.attempts,
                backoff_ms,
                retry_ms,
                duration_ms,
                outcome,
                "Image generated"
            ),
            Ok(None) => tracing::info!(
                attempts = metrics.attempts,
                backoff_ms,
                retry_ms,
                outcome,
                "Generation cancelled"
            ),
            Err(e) => tracing::error!(
                attempts = metrics.attempts,
                rate_limited = metrics.rate_limited,
                backoff_ms,
                retry_ms,
                duration_ms,
                outcome,
                error = %e,
                "Generation failed"
            ),
        }

        result
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }
}
