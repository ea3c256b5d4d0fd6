//! Error types for purchase webhook verification and processing.

use thiserror::Error;

/// Errors that occur while verifying or processing a purchase webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The declared signature does not match the computed one.
    #[error("invalid signature")]
    InvalidSignature,

    /// The declared signature is not valid hex or has the wrong length.
    #[error("malformed signature")]
    MalformedSignature,

    /// The verified payload could not be parsed as a purchase event.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Required field missing from the purchase event.
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

impl WebhookError {
    /// Returns true if the sender should retry delivering this webhook.
    ///
    /// Signature and parse failures are permanent for a given payload; the
    /// sender will never succeed by replaying the identical bytes.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
