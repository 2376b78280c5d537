//! Environment variable constants used throughout the application
//!
//! This module centralizes all environment variable names to ensure consistency
//! and make it easier to manage configuration across the codebase.

/// Logging configuration
pub mod logging {
    /// Log level configuration (e.g., "debug", "info", "warn", "error")
    pub const LOG_LEVEL: &str = "GENBOOTH_LOG_LEVEL";

    /// Log file path for file-based logging
    pub const LOG_FILE: &str = "GENBOOTH_LOG_FILE";

    /// Emit logs as JSON lines
    pub const LOG_JSON: &str = "GENBOOTH_LOG_JSON";

    /// Disable colored output (follows the NO_COLOR standard)
    pub const NO_COLOR: &str = "NO_COLOR";
}

/// Generation endpoint configuration
pub mod generation {
    /// URL of the generation proxy endpoint
    pub const ENDPOINT: &str = "GENBOOTH_ENDPOINT";

    /// Default model identifier
    pub const MODEL: &str = "GENBOOTH_MODEL";

    /// Per-attempt timeout (milliseconds)
    pub const TIMEOUT_MS: &str = "GENBOOTH_TIMEOUT_MS";

    /// Maximum concurrent generation calls
    pub const CONCURRENT: &str = "GENBOOTH_CONCURRENT";
}

/// Retry tuning
pub mod retry {
    /// Maximum attempts per call
    pub const MAX_ATTEMPTS: &str = "GENBOOTH_MAX_ATTEMPTS";

    /// Base backoff delay (milliseconds)
    pub const BASE_DELAY_MS: &str = "GENBOOTH_BASE_DELAY_MS";

    /// Extra delay after a rate-limited attempt (milliseconds)
    pub const RATE_LIMIT_PENALTY_MS: &str = "GENBOOTH_RATE_LIMIT_PENALTY_MS";
}
