//! Domain layer: pure types and logic with no I/O dependencies.

pub mod foundation;
pub mod license;
pub mod sync;
pub mod webhook;
