//! Axum router configuration for the internal sync trigger.

use axum::routing::post;
use axum::Router;

use super::handlers::{run_sync, SyncAppState};

/// Create the internal sync router.
///
/// # Routes
/// - `POST /run` - Fire one reconciliation run
pub fn sync_routes() -> Router<SyncAppState> {
    Router::new().route("/run", post(run_sync))
}
