use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{GenboothError, Result};

/// MIME type assumed for raw base64 input that carries no data URI prefix
pub const DEFAULT_INPUT_MIME: &str = "image/jpeg";

/// MIME type the booth reports for generated images
pub const OUTPUT_MIME: &str = "image/png";

fn data_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:([A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+)?(?:;[^;,]*)*;base64,")
            .expect("data URI pattern is valid")
    })
}

/// Remove a leading `data:<mime>;base64,` prefix, leaving the payload.
/// Input without a prefix is returned unchanged.
pub fn strip_data_uri_prefix(value: &str) -> &str {
    match data_uri_pattern().find(value) {
        Some(m) => &value[m.end()..],
        None => value,
    }
}

/// A base64 `data:` URI split into its MIME type and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub payload: String,
}

impl DataUri {
    pub fn new(mime_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            payload: payload.into(),
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let captures = data_uri_pattern()
            .captures(value)
            .ok_or_else(|| GenboothError::invalid_image("not a base64 data URI"))?;
        let prefix_len = captures.get(0).map(|m| m.end()).unwrap_or(0);
        let mime_type = captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "text/plain".to_string());

        Ok(Self {
            mime_type,
            payload: value[prefix_len..].to_string(),
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.payload.trim())
            .map_err(|e| GenboothError::invalid_image(format!("invalid base64 payload: {e}")))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.payload)
    }
}

/// Image sent along with a prompt: base64 payload plus its MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputImage {
    pub mime_type: String,
    pub data: String,
}

impl InputImage {
    /// Accepts either a full data URI or bare base64 (assumed JPEG)
    pub fn from_base64(value: &str) -> Self {
        match DataUri::parse(value) {
            Ok(uri) => Self {
                mime_type: uri.mime_type,
                data: uri.payload,
            },
            Err(_) => Self {
                mime_type: DEFAULT_INPUT_MIME.to_string(),
                data: strip_data_uri_prefix(value).to_string(),
            },
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(GenboothError::invalid_image(format!(
                "{} is empty",
                path.display()
            )));
        }
        Ok(Self::from_bytes(mime_from_extension(path), &bytes))
    }
}

/// Guess an image MIME type from a file extension
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => DEFAULT_INPUT_MIME,
    }
}

/// Image returned by a successful generation, as a PNG data URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    data_uri: String,
}

impl GeneratedImage {
    pub fn from_payload(payload: &str) -> Self {
        Self {
            data_uri: DataUri::new(OUTPUT_MIME, payload).to_string(),
        }
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn payload(&self) -> &str {
        strip_data_uri_prefix(&self.data_uri)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        DataUri::new(OUTPUT_MIME, self.payload()).decode()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.decode()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn into_data_uri(self) -> String {
        self.data_uri
    }
}
