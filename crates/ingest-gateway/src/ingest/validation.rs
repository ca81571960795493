//! Payload validation.

/// Decides whether a request body is a well-formed document.
///
/// Implementations are pure: no I/O, no panics, and the same answer for the
/// same bytes.
pub trait PayloadValidator: Send + Sync {
    /// Whether `payload` is well formed.
    fn is_valid(&self, payload: &[u8]) -> bool;

    /// Format name used in logs.
    fn format(&self) -> &'static str;
}

/// Accepts any syntactically valid JSON text.
///
/// Scalars, empty containers and surrounding whitespace are all valid.
/// Strings must be valid UTF-8. Nothing is checked beyond syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonValidator;

impl PayloadValidator for JsonValidator {
    fn is_valid(&self, payload: &[u8]) -> bool {
        serde_json::from_slice::<serde_json::Value>(payload).is_ok()
    }

    fn format(&self) -> &'static str {
        "json"
    }
}
