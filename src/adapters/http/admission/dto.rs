//! HTTP DTOs for admission endpoints.
//!
//! These types define the JSON request/response structure for the admission
//! API. They serve as the boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::AdmissionDecision;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to check whether a caller may proceed against a resource.
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionCheckRequest {
    /// Name of the guarded resource, e.g. `syncuser`.
    pub resource: String,
    /// Caller identity the counter is scoped to.
    pub identity: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body returned for both admitted and denied checks.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionCheckResponse {
    pub allowed: bool,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u32>,
}

impl From<AdmissionDecision> for AdmissionCheckResponse {
    fn from(decision: AdmissionDecision) -> Self {
        match decision {
            AdmissionDecision::Allowed {
                limit,
                remaining,
                reset_at,
                window_secs,
            } => Self {
                allowed: true,
                limit,
                remaining: Some(remaining),
                reset_at: Some(reset_at.as_unix_secs()),
                window_secs: Some(window_secs),
                retry_after_secs: None,
            },
            AdmissionDecision::Denied {
                limit,
                retry_after_secs,
            } => Self {
                allowed: false,
                limit,
                remaining: Some(0),
                reset_at: None,
                window_secs: None,
                retry_after_secs: Some(retry_after_secs),
            },
        }
    }
}

/// Generic error body for admission endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
