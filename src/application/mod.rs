//! Application layer: services orchestrating the ports.

pub mod issuance;
pub mod rate_limiter;
pub mod sync_engine;

pub use issuance::{IssuanceError, IssuanceService};
pub use rate_limiter::{
    AdmissionDecision, MetricsSnapshot, RateLimitError, RateLimitService, ResourceMetrics,
};
pub use sync_engine::{RunOutcome, SyncEngine, SyncError};
