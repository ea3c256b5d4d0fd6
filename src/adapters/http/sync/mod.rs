//! HTTP adapter for the internal sync trigger.
//!
//! - `POST /api/internal/sync/run` - Fire one reconciliation run

pub mod handlers;
pub mod routes;

pub use handlers::SyncAppState;
pub use routes::sync_routes;
