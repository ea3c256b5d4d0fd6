//! HTTP handler for the internal sync trigger.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{info, warn};

use crate::application::{SyncEngine, SyncError};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the sync trigger endpoint.
#[derive(Clone)]
pub struct SyncAppState {
    pub engine: Arc<SyncEngine>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/internal/sync/run - Fire one reconciliation run.
///
/// Idempotent: a concurrent-run skip and an absorbed failure both answer
/// 200 with a distinguishing `outcome` field, so the scheduler never sees
/// a 5xx for an expected condition.
pub async fn run_sync(State(state): State<SyncAppState>) -> impl IntoResponse {
    match state.engine.run(SyncEngine::USER_SYNC_JOB).await {
        Ok(outcome) => {
            info!(?outcome, "sync run finished");
            (StatusCode::OK, Json(serde_json::to_value(outcome).unwrap_or_default()))
        }
        Err(SyncError::ConcurrentRun) => {
            info!("sync run skipped: already in progress");
            (StatusCode::OK, Json(json!({ "outcome": "skipped" })))
        }
        Err(e) => {
            warn!(error = %e, "sync run failed");
            (StatusCode::OK, Json(json!({ "outcome": "failed" })))
        }
    }
}
