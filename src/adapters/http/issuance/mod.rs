//! HTTP adapter for issuance endpoints.
//!
//! Exposes the serial ledger via REST API:
//! - `POST /api/webhooks/purchase` - HMAC-verified purchase notification
//! - `POST /api/serials/issue` - Token-guarded issuance
//! - `POST /api/serials/claim` - Claim an issued serial

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::IssuanceAppState;
pub use routes::{serial_routes, webhook_routes};
