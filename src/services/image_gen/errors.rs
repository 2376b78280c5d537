use thiserror::Error;

/// Failures of a single outbound call. Every variant is retryable.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl TransportError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::RateLimited { .. })
    }

    /// Classify a non-2xx proxy response.
    ///
    /// The provider's error envelope (`{"error": {"message", "status"}}`) is used
    /// when present; `RESOURCE_EXHAUSTED` counts as rate limiting whatever the code.
    pub fn from_status_and_body(status: u16, body: &str) -> Self {
        let envelope = serde_json::from_str::<serde_json::Value>(body).ok();
        let error = envelope.as_ref().and_then(|v| v.get("error"));

        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or(body)
            .to_string();
        let provider_status = error
            .and_then(|e| e.get("status"))
            .and_then(|s| s.as_str());

        if status == 429 || provider_status == Some("RESOURCE_EXHAUSTED") {
            TransportError::RateLimited { message }
        } else {
            TransportError::Http { status, message }
        }
    }

    #[cfg(feature = "reqwest")]
    pub fn from_reqwest_error(error: reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            TransportError::Timeout { timeout_ms }
        } else {
            TransportError::Network {
                message: error.to_string(),
            }
        }
    }
}

/// Semantic rejections found in an otherwise successful response.
/// Retrying the same prompt reproduces these, so they are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Prompt was blocked: {reason}")]
    PromptBlocked { reason: String },

    #[error("Response contained no candidates")]
    NoCandidates,

    #[error("Candidate has no content{}", finish_reason_suffix(.finish_reason))]
    EmptyContent { finish_reason: Option<String> },

    #[error("Generation stopped by provider policy: {finish_reason}")]
    PolicyViolation { finish_reason: String },

    #[error("Model returned text instead of an image: {text}")]
    TextOnly { text: String },

    #[error("Response contained no inline image data")]
    NoInlineData,

    #[error("Malformed response: {message}")]
    Malformed { message: String },
}

fn finish_reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(" (finish reason: {reason})"),
        None => String::new(),
    }
}

/// Error surfaced by `ImageGenerator::generate`
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Retryable(#[from] TransportError),

    #[error(transparent)]
    Terminal(#[from] ResponseError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Generation limiter is closed")]
    LimiterClosed,
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Retryable(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::Retryable(e) if e.is_rate_limited())
    }

    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Retryable(TransportError::RateLimited { .. }) => {
                "The image service is busy right now. Please wait a moment and try again."
                    .to_string()
            }
            GenerationError::Retryable(TransportError::Timeout { .. }) => {
                "The image service took too long to respond. Please try again.".to_string()
            }
            GenerationError::Retryable(TransportError::Network { .. }) => {
                "Network connection error. Please check your connection.".to_string()
            }
            GenerationError::Retryable(TransportError::Http { status, .. }) => {
                format!("The image service returned an error (HTTP {status}).")
            }
            GenerationError::Terminal(e) => e.to_string(),
            GenerationError::Configuration { message } => {
                format!("Configuration error: {message}")
            }
            GenerationError::LimiterClosed => "Generation was stopped before it started.".to_string(),
        }
    }
}
