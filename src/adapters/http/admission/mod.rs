//! HTTP adapter for admission endpoints.
//!
//! Exposes the rate limiter via REST API:
//! - `POST /api/admission/check` - Gate a request against a resource limit
//! - `GET /api/admission/metrics` - Per-resource admit/deny totals

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::AdmissionAppState;
pub use routes::admission_routes;
