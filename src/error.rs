use thiserror::Error;

use crate::services::image_gen::GenerationError;

/// Custom error types for the genbooth application
#[derive(Error, Debug)]
pub enum GenboothError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid image: {message}")]
    InvalidImage { message: String },

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl GenboothError {
    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid image error
    pub fn invalid_image<S: Into<String>>(message: S) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Message suitable for showing to the person running the booth
    pub fn user_message(&self) -> String {
        match self {
            Self::Generation(e) => format!("Generation failed: {}", e.user_message()),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenboothError>;
