pub mod client;
pub mod errors;
pub mod limiter;
pub mod models;
pub mod retry;
pub mod transport;
pub mod validator;

pub use client::{GeneratorConfig, ImageGenerator, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use errors::{GenerationError, ResponseError, TransportError};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use models::{
    Candidate, CandidateContent, GenerationRequest, InlineBlob, InlineData, PromptFeedback,
    ProviderResponse, ProxyRequest, RequestPart, ResponsePart, SafetySetting, HARM_CATEGORIES,
};
pub use retry::{with_retry, RetryConfig, RetryHandler, RetryMetrics, RetryOutcome};
#[cfg(feature = "reqwest")]
pub use transport::HttpTransport;
pub use transport::{TimeoutGuard, Transport};
pub use validator::{validate_body, validate_json, validate_response, POLICY_FINISH_REASONS};
