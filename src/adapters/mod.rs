//! Adapters - concrete implementations of the ports.
//!
//! Inbound adapters (HTTP) translate requests into application calls;
//! outbound adapters (Redis, PostgreSQL, the directory client) implement
//! the ports the application depends on. In-memory twins back the tests.

pub mod counter_store;
pub mod directory;
pub mod http;
pub mod postgres;
pub mod sync;
