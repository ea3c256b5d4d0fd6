//! HTTP DTOs for issuance endpoints.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to issue a serial for an order through the authenticated endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    pub order_id: String,
}

/// Request to claim an issued serial.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    pub serial: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Successful issuance, from either the webhook or the token-guarded endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct IssueResponse {
    pub ok: bool,
    pub serial: String,
}

/// Deliberately uninformative failure body.
///
/// Issuance failures share one shape so callers cannot distinguish a bad
/// credential from a bad payload or an internal fault.
#[derive(Debug, Clone, Serialize)]
pub struct NeutralFailure {
    pub ok: bool,
}

impl NeutralFailure {
    pub fn new() -> Self {
        Self { ok: false }
    }
}

impl Default for NeutralFailure {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a claim attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimResponse {
    pub claimed: bool,
}
