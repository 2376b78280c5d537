pub mod image_gen;

pub use image_gen::{
    ConcurrencyLimiter, GenerationError, GenerationRequest, GeneratorConfig, ImageGenerator,
    RetryConfig,
};
