//! Interpretation of provider responses.
//!
//! Checks run in a fixed order: candidates, then content, then finish reason,
//! then inline data, with a text-only explanation as the last specific fallback.

use tracing::debug;

use super::errors::ResponseError;
use super::models::{Candidate, ProviderResponse};
use crate::models::image::GeneratedImage;

/// Finish reasons that mean the provider refused on policy grounds
pub const POLICY_FINISH_REASONS: [&str; 6] = [
    "SAFETY",
    "RECITATION",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

pub fn is_policy_finish_reason(reason: &str) -> bool {
    POLICY_FINISH_REASONS.contains(&reason)
}

/// Parse a raw 2xx body and validate it. A body that is not JSON is reported
/// with the parser's own message.
pub fn validate_body(body: &str) -> Result<GeneratedImage, ResponseError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ResponseError::Malformed {
            message: format!("invalid JSON body: {e}"),
        })?;
    validate_json(&value)
}

/// Validate an already parsed 2xx body
pub fn validate_json(body: &serde_json::Value) -> Result<GeneratedImage, ResponseError> {
    if !body.is_object() {
        return Err(ResponseError::Malformed {
            message: "response body is not a JSON object".to_string(),
        });
    }
    let response: ProviderResponse =
        serde_json::from_value(body.clone()).map_err(|e| ResponseError::Malformed {
            message: e.to_string(),
        })?;
    validate_response(&response)
}

pub fn validate_response(response: &ProviderResponse) -> Result<GeneratedImage, ResponseError> {
    let candidate = match response.candidates.as_deref() {
        Some([first, ..]) => first,
        _ => {
            let block_reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone());
            return Err(match block_reason {
                Some(reason) => ResponseError::PromptBlocked { reason },
                None => ResponseError::NoCandidates,
            });
        }
    };

    let parts = match candidate_parts(candidate) {
        Some(parts) => parts,
        None => {
            return Err(ResponseError::EmptyContent {
                finish_reason: candidate.finish_reason.clone(),
            })
        }
    };

    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|r| is_policy_finish_reason(r))
    {
        return Err(ResponseError::PolicyViolation {
            finish_reason: reason.to_string(),
        });
    }

    let payload = parts.iter().find_map(|part| {
        part.inline_data
            .as_ref()
            .and_then(|blob| blob.data.as_deref())
            .filter(|data| !data.is_empty())
    });
    if let Some(payload) = payload {
        debug!(payload_len = payload.len(), "Extracted inline image data");
        return Ok(GeneratedImage::from_payload(payload));
    }

    let text: String = parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();
    if !text.trim().is_empty() {
        return Err(ResponseError::TextOnly { text });
    }

    Err(ResponseError::NoInlineData)
}

fn candidate_parts(candidate: &Candidate) -> Option<&[super::models::ResponsePart]> {
    candidate
        .content
        .as_ref()
        .and_then(|content| content.parts.as_deref())
        .filter(|parts| !parts.is_empty())
}
