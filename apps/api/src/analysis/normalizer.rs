//! Response Normalizer — turns free-form model output into a JSON record.
//!
//! Never fails. The result is either the parsed JSON or `{"raw_response": ...}`
//! carrying the post-strip text when that is not (acceptable) JSON. Consumers
//! must also accept `{"error": ...}` envelopes on records.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::analysis::schema::validate_analysis;
use crate::llm_client::Completion;

pub const RAW_RESPONSE_KEY: &str = "raw_response";
pub const ERROR_KEY: &str = "error";

/// How much the normalizer trusts the model's schema adherence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Any valid JSON is accepted as-is.
    #[default]
    Trust,
    /// JSON must also match the analysis schema; violations fall back to raw.
    Validate,
}

/// Which of the three record shapes a normalized value has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedShape {
    Parsed,
    RawFallback,
    ErrorFallback,
}

impl NormalizedShape {
    pub fn of(value: &Value) -> Self {
        let single_key = |key: &str| {
            value
                .as_object()
                .map(|m| m.len() == 1 && m.contains_key(key))
                .unwrap_or(false)
        };
        if single_key(RAW_RESPONSE_KEY) {
            NormalizedShape::RawFallback
        } else if single_key(ERROR_KEY) {
            NormalizedShape::ErrorFallback
        } else {
            NormalizedShape::Parsed
        }
    }
}

pub fn normalize_completion(completion: &Completion, policy: SchemaPolicy) -> Value {
    normalize_text(&completion.text, policy)
}

pub fn normalize_text(text: &str, policy: SchemaPolicy) -> Value {
    let body = strip_code_fence(text);

    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            debug!("Completion is not valid JSON ({e}); keeping raw text");
            return raw_fallback(body);
        }
    };

    if policy == SchemaPolicy::Validate {
        if let Err(violation) = validate_analysis(&parsed) {
            warn!("Completion failed schema validation: {violation}");
            return raw_fallback(body);
        }
    }

    parsed
}

fn raw_fallback(text: &str) -> Value {
    json!({ RAW_RESPONSE_KEY: text })
}

/// Extracts the body of a fenced code block.
///
/// A text starting (after whitespace) with ```` ```json ```` or ```` ``` ````
/// yields the trimmed content up to the first closing fence. Without a
/// closing fence, or without an opening one, the text is returned unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let opened = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"));

    match opened {
        Some(inner) => match inner.find("```") {
            Some(end) => inner[..end].trim(),
            None => text,
        },
        None => text,
    }
}
