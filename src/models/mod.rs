pub mod image;

pub use image::{strip_data_uri_prefix, DataUri, GeneratedImage, InputImage};
