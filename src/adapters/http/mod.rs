//! HTTP adapters - REST API implementations.
//!
//! Each application concern has its own HTTP adapter for endpoint exposure.

pub mod admission;
pub mod issuance;
pub mod sync;

// Re-export key types for convenience
pub use admission::{admission_routes, AdmissionAppState};
pub use issuance::{serial_routes, webhook_routes, IssuanceAppState};
pub use sync::{sync_routes, SyncAppState};
