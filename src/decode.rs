//! Payload decoding for captured datagrams
//!
//! Miners broadcast their status as one JSON document per datagram, but the
//! port also sees discovery probes and other plain-text traffic. Decoding
//! never drops a payload: the raw text is preserved for display even when
//! the JSON parse fails.

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Decode Errors
// ============================================================================

/// Why a payload could not be interpreted as a JSON document
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload bytes are not valid UTF-8
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Payload is text but not a well-formed JSON document
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Observation
// ============================================================================

/// One decoded datagram, ready for reporting
#[derive(Debug)]
pub struct Observation {
    /// Raw payload rendered as text (lossy for non-UTF-8), trimmed
    pub text: String,
    /// Parsed document, or the reason parsing failed
    pub doc: Result<Value, DecodeError>,
}

/// Decode one datagram payload.
///
/// UTF-8 decoding is attempted first, then a JSON parse of the trimmed text.
/// Both failures are recoverable; the observation still carries the raw text
/// so it can be shown as-is.
pub fn decode(payload: &[u8]) -> Observation {
    match std::str::from_utf8(payload) {
        Ok(text) => {
            let text = text.trim().to_string();
            let doc = serde_json::from_str::<Value>(&text).map_err(DecodeError::from);
            Observation { text, doc }
        }
        Err(e) => Observation {
            text: String::from_utf8_lossy(payload).trim().to_string(),
            doc: Err(DecodeError::Utf8(e)),
        },
    }
}

/// Runtime type of a JSON value, for the per-field listing
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
