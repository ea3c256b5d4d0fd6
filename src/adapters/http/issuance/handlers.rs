//! HTTP handlers for issuance endpoints.
//!
//! The webhook and token-guarded endpoints answer failures with one neutral
//! body. Nothing in a response distinguishes a bad signature from a bad
//! payload, and the pre-shared token comparison is constant time.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use secrecy::{ExposeSecret, Secret};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::application::{IssuanceError, IssuanceService};

use super::dto::{ClaimRequest, ClaimResponse, IssueRequest, IssueResponse, NeutralFailure};

const SIGNATURE_HEADER: &str = "x-webhook-signature";
const ISSUE_TOKEN_HEADER: &str = "x-issuance-token";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for issuance endpoints.
#[derive(Clone)]
pub struct IssuanceAppState {
    pub issuance: Arc<IssuanceService>,
    pub issue_token: Secret<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/purchase - Verified purchase notification.
///
/// The signature covers the raw payload bytes exactly as received, so the
/// body is taken as `Bytes` and never touched by a JSON extractor before
/// verification.
pub async fn handle_purchase_webhook(
    State(state): State<IssuanceAppState>,
    headers: HeaderMap,
    payload: Bytes,
) -> impl IntoResponse {
    let declared = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match state.issuance.confirm_purchase(&payload, declared).await {
        Ok(serial) => {
            info!(order_id = %serial.order_id, "purchase webhook issued serial");
            (
                StatusCode::OK,
                Json(IssueResponse {
                    ok: true,
                    serial: serial.serial,
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "purchase webhook rejected");
            (StatusCode::BAD_REQUEST, Json(NeutralFailure::new())).into_response()
        }
    }
}

/// POST /api/serials/issue - Issue a serial with a pre-shared credential.
pub async fn issue_serial(
    State(state): State<IssuanceAppState>,
    headers: HeaderMap,
    Json(request): Json<IssueRequest>,
) -> impl IntoResponse {
    let presented = headers
        .get(ISSUE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let expected = state.issue_token.expose_secret().as_bytes();
    if presented.as_bytes().ct_eq(expected).unwrap_u8() != 1 {
        warn!("serial issue rejected: bad credential");
        return (StatusCode::BAD_REQUEST, Json(NeutralFailure::new())).into_response();
    }

    if request.order_id.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(NeutralFailure::new())).into_response();
    }

    match state.issuance.issue(&request.order_id).await {
        Ok(serial) => (
            StatusCode::OK,
            Json(IssueResponse {
                ok: true,
                serial: serial.serial,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "serial issue failed");
            (StatusCode::BAD_REQUEST, Json(NeutralFailure::new())).into_response()
        }
    }
}

/// POST /api/serials/claim - Claim an issued serial.
///
/// An unknown or already-claimed serial is a normal `claimed: false`
/// outcome, not an error.
pub async fn claim_serial(
    State(state): State<IssuanceAppState>,
    Json(request): Json<ClaimRequest>,
) -> impl IntoResponse {
    match state.issuance.claim(&request.serial).await {
        Ok(claimed) => (StatusCode::OK, Json(ClaimResponse { claimed })).into_response(),
        Err(IssuanceError::Unavailable(e)) => {
            warn!(error = %e, "serial claim store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(NeutralFailure::new())).into_response()
        }
        Err(e) => {
            warn!(error = %e, "serial claim failed");
            (StatusCode::BAD_REQUEST, Json(NeutralFailure::new())).into_response()
        }
    }
}
