//! Keygate - admission control and license issuance backend.
//!
//! This crate gates request traffic with windowed counters, reconciles an
//! external user directory through a resumable paginated sync, and keeps a
//! ledger of license serials fed by HMAC-verified purchase webhooks.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
