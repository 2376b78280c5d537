use backoff::{backoff::Backoff, ExponentialBackoff};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::errors::GenerationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub rate_limit_penalty: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1233),
            rate_limit_penalty: Duration::from_millis(10_000),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_rate_limit_penalty(mut self, penalty: Duration) -> Self {
        self.rate_limit_penalty = penalty;
        self
    }

    /// Near-zero delays for tests and local proxies
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1),
            rate_limit_penalty: Duration::from_millis(1),
        }
    }
}

/// How a retried call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded,
    Cancelled,
    Exhausted,
    Rejected,
}

impl RetryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RetryOutcome::Succeeded => "succeeded",
            RetryOutcome::Cancelled => "cancelled",
            RetryOutcome::Exhausted => "exhausted",
            RetryOutcome::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryMetrics {
    pub attempts: u32,
    pub rate_limited: u32,
    pub total_delay: Duration,
    pub elapsed: Duration,
    pub outcome: Option<RetryOutcome>,
}

impl RetryMetrics {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            rate_limited: 0,
            total_delay: Duration::ZERO,
            elapsed: Duration::ZERO,
            outcome: None,
        }
    }

    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

impl Default for RetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one call through bounded attempts with exponential backoff.
///
/// After failed attempt `k` (0-indexed) it waits `base_delay * 2^k`, plus the
/// rate-limit penalty when that failure was rate limited.
pub struct RetryHandler {
    config: RetryConfig,
    backoff: ExponentialBackoff,
    metrics: RetryMetrics,
    start_time: Instant,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        let backoff = ExponentialBackoff {
            current_interval: config.base_delay,
            initial_interval: config.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: Duration::MAX,
            max_elapsed_time: None,
            ..Default::default()
        };

        Self {
            config,
            backoff,
            metrics: RetryMetrics::new(),
            start_time: Instant::now(),
        }
    }

    /// Delay to wait after a failed attempt. Advances the backoff sequence.
    pub fn next_delay(&mut self, error: &GenerationError) -> Duration {
        let mut delay = self
            .backoff
            .next_backoff()
            .unwrap_or(self.backoff.max_interval);
        if error.is_rate_limited() {
            delay = delay.saturating_add(self.config.rate_limit_penalty);
        }
        delay
    }

    /// Run `operation` until it succeeds, fails terminally, runs out of attempts,
    /// or `cancel` fires. `Ok(None)` means the call was cancelled, either by the
    /// token or by the operation itself reporting cancellation.
    pub async fn retry<F, Fut, T>(
        &mut self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<Option<T>, GenerationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>, GenerationError>>,
    {
        let result = self.run_attempts(cancel, &mut operation).await;
        self.metrics.elapsed = self.start_time.elapsed();
        self.metrics.outcome = Some(match &result {
            Ok(Some(_)) => RetryOutcome::Succeeded,
            Ok(None) => RetryOutcome::Cancelled,
            Err(e) if e.is_retryable() => RetryOutcome::Exhausted,
            Err(_) => RetryOutcome::Rejected,
        });
        result
    }

    async fn run_attempts<F, Fut, T>(
        &mut self,
        cancel: &CancellationToken,
        operation: &mut F,
    ) -> Result<Option<T>, GenerationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>, GenerationError>>,
    {
        if self.config.max_attempts == 0 {
            return Err(GenerationError::Configuration {
                message: "max_attempts must be at least 1".to_string(),
            });
        }

        for attempt in 0..self.config.max_attempts {
            if cancel.is_cancelled() {
                tracing::debug!(attempt, "Cancelled before attempt");
                return Ok(None);
            }

            self.metrics.attempts += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                outcome = operation(attempt) => outcome,
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => error,
            };

            if cancel.is_cancelled() {
                return Ok(None);
            }
            if error.is_rate_limited() {
                self.metrics.rate_limited += 1;
            }
            if attempt + 1 >= self.config.max_attempts {
                tracing::warn!(
                    attempts = self.metrics.attempts,
                    error = %error,
                    "Retry budget exhausted"
                );
                return Err(error);
            }

            let delay = self.next_delay(&error);
            self.metrics.total_delay += delay;
            tracing::warn!(
                "Attempt {} failed with retryable error: {}. Retrying in {:?}",
                attempt + 1,
                error,
                delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(attempt, "Cancelled during backoff");
                    return Ok(None);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        unreachable!("retry loop returns on its final attempt")
    }

    pub fn attempts(&self) -> u32 {
        self.metrics.attempts
    }

    pub fn metrics(&self) -> &RetryMetrics {
        &self.metrics
    }
}

pub async fn with_retry<F, Fut, T>(
    config: RetryConfig,
    cancel: &CancellationToken,
    operation: F,
) -> Result<Option<T>, GenerationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, GenerationError>>,
{
    let mut handler = RetryHandler::new(config);
    handler.retry(cancel, operation).await
}
