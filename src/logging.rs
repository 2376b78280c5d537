use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

use crate::env::logging as env_vars;

/// Logging configuration for genbooth, read from `GENBOOTH_LOG_*` and `NO_COLOR`
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Defaults to warn so CLI output stays readable
    pub level: Level,
    /// Also write to this file when set
    pub file_path: Option<PathBuf>,
    pub json_format: bool,
    pub use_colors: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            file_path: None,
            json_format: false,
            use_colors: true,
        }
    }
}

impl LoggingConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup(env_vars::LOG_LEVEL) {
            config.level = parse_level(&level);
        }
        if let Some(path) = lookup(env_vars::LOG_FILE).filter(|p| !p.trim().is_empty()) {
            config.file_path = Some(PathBuf::from(path));
        }
        if let Some(json) = lookup(env_vars::LOG_JSON) {
            config.json_format = matches!(json.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if lookup(env_vars::NO_COLOR).is_some() {
            config.use_colors = false;
        }

        config
    }
}

/// Parse a level name, falling back to WARN for anything unrecognised
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::WARN,
    }
}

fn format_layer<W>(
    layer: fmt::Layer<Registry, fmt::format::DefaultFields, fmt::format::Format, W>,
    json: bool,
    filter: LevelFilter,
) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.with_filter(filter).boxed()
    }
}

/// Initialize logging with the given configuration.
///
/// Returns the file writer guard when a log file is configured; it must be held
/// for the lifetime of the program or buffered lines are lost.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = LevelFilter::from_level(config.level);
    let mut layers = vec![format_layer(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.use_colors)
            .with_target(true),
        config.json_format,
        filter,
    )];

    let mut guard = None;
    if let Some(path) = &config.file_path {
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path
            .file_name()
            .context("Log file path has no file name")?;
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;

        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        layers.push(format_layer(
            fmt::layer().with_writer(writer).with_ansi(false).with_target(true),
            config.json_format,
            filter,
        ));
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        level = ?config.level,
        file_path = ?config.file_path,
        json_format = config.json_format,
        "Logging initialized"
    );

    Ok(guard)
}

/// Initialize logging from environment variables
pub fn init_from_env() -> Result<Option<WorkerGuard>> {
    init_logging(LoggingConfig::from_env())
}

/// Log performance metrics
pub fn log_performance(operation: &str, duration_ms: u64, success: bool) {
    if success {
        tracing::info!(operation, duration_ms, success, "Operation completed");
    } else {
        tracing::warn!(operation, duration_ms, success, "Operation failed");
    }
}
