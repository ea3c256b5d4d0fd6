//! Axum router configuration for admission endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{check_admission, get_metrics, AdmissionAppState};

/// Create the admission API router.
///
/// # Routes
/// - `POST /check` - Gate a request against a configured resource limit
/// - `GET /metrics` - Per-resource admit/deny totals
pub fn admission_routes() -> Router<AdmissionAppState> {
    Router::new()
        .route("/check", post(check_admission))
        .route("/metrics", get(get_metrics))
}
