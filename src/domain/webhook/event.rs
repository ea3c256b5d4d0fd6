//! Purchase confirmation event carried by a verified webhook.

use serde::{Deserialize, Serialize};

use super::errors::WebhookError;

/// A purchase confirmation parsed from a verified webhook payload.
///
/// Only ever constructed from payload bytes whose signature has already been
/// verified; handlers must not parse unverified input into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    /// Identifier of the order in the payment provider.
    pub order_id: String,
    /// Buyer email, if the provider includes it.
    #[serde(default)]
    pub email: Option<String>,
    /// Provider event type (e.g. "order.completed").
    #[serde(default)]
    pub event_type: Option<String>,
}

impl PurchaseEvent {
    /// Parses a purchase event from verified payload bytes.
    pub fn from_verified_payload(payload: &[u8]) -> Result<Self, WebhookError> {
        let event: PurchaseEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        if event.order_id.is_empty() {
            return Err(WebhookError::MissingField("order_id"));
        }

        Ok(event)
    }
}
