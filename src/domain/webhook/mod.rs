//! Purchase webhook verification domain.

mod errors;
mod event;
mod verifier;

pub use errors::WebhookError;
pub use event::PurchaseEvent;
pub use verifier::WebhookVerifier;
