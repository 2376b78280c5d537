#[cfg(feature = "reqwest")]
pub mod cli;
pub mod config;
pub mod models;
pub mod services;

pub mod env;
pub mod error;
pub mod logging;

pub use error::{GenboothError, Result};
pub use logging::{init_logging, LoggingConfig};
pub use models::{GeneratedImage, InputImage};
pub use services::image_gen::{GenerationRequest, GeneratorConfig, ImageGenerator};
