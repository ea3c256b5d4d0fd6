//! HTTP handlers for admission endpoints.
//!
//! These handlers connect Axum routes to the rate limiter service.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use crate::application::{RateLimitError, RateLimitService};

use super::dto::{AdmissionCheckRequest, AdmissionCheckResponse, ErrorResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for admission endpoints.
#[derive(Clone)]
pub struct AdmissionAppState {
    pub rate_limiter: Arc<RateLimitService>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admission/check - Gate one request against a resource limit.
///
/// An admitted check returns 200 with the remaining quota; a denied check
/// returns 429 with a retry hint. When the counter store is unreachable the
/// endpoint fails closed with 503 and a neutral body.
pub async fn check_admission(
    State(state): State<AdmissionAppState>,
    Json(request): Json<AdmissionCheckRequest>,
) -> impl IntoResponse {
    match state
        .rate_limiter
        .admit(&request.resource, &request.identity)
        .await
    {
        Ok(decision) => {
            let status = if decision.is_allowed() {
                StatusCode::OK
            } else {
                StatusCode::TOO_MANY_REQUESTS
            };
            (status, Json(AdmissionCheckResponse::from(decision))).into_response()
        }
        Err(RateLimitError::UnknownResource(resource)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "UNKNOWN_RESOURCE",
                format!("no limit configured for resource '{resource}'"),
            )),
        )
            .into_response(),
        Err(RateLimitError::InvalidIdentity) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("INVALID_IDENTITY", "identity must not be empty")),
        )
            .into_response(),
        Err(RateLimitError::Unavailable(e)) => {
            warn!(error = %e, "admission check failed closed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    "LIMITER_UNAVAILABLE",
                    "admission temporarily unavailable",
                )),
            )
                .into_response()
        }
    }
}

/// GET /api/admission/metrics - Per-resource admit/deny rollup.
pub async fn get_metrics(State(state): State<AdmissionAppState>) -> impl IntoResponse {
    match state.rate_limiter.metrics().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => {
            warn!(error = %e, "metrics snapshot failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    "METRICS_UNAVAILABLE",
                    "metrics temporarily unavailable",
                )),
            )
                .into_response()
        }
    }
}
