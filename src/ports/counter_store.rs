//! Shared counter store port.
//!
//! The counter store is the only consistency boundary between concurrent,
//! short-lived invocations: rate-limit windows and metric rollups are all
//! expressed as atomic increments against it. Implementations must be
//! thread-safe, and every operation must be bounded by a timeout so a slow
//! backend can never hang an invocation past its execution budget.

use async_trait::async_trait;
use std::time::Duration;

/// Port for the durable, atomically-mutable key-value counter store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increments the counter at `key` by one, returning the
    /// post-increment value.
    ///
    /// If `ttl` is given and the increment created the key, the key expires
    /// after the TTL elapses. The TTL of an existing key is left untouched.
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<i64, CounterStoreError>;

    /// Reads the current value of a counter, or `None` if the key does not
    /// exist (or has expired).
    async fn get(&self, key: &str) -> Result<Option<i64>, CounterStoreError>;

    /// Removes a counter. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CounterStoreError>;
}

/// Errors surfaced by counter store operations.
///
/// Callers fail closed on either variant: an unreachable store must deny
/// admission rather than allow unmetered traffic.
#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    /// The backing store is unreachable or returned an error.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    /// The operation exceeded its deadline.
    #[error("counter store operation timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_displays_cause() {
        let err = CounterStoreError::Unavailable("connection refused".to_string());
        assert_eq!(
            format!("{}", err),
            "counter store unavailable: connection refused"
        );
    }

    #[test]
    fn timeout_displays_correctly() {
        assert_eq!(
            format!("{}", CounterStoreError::Timeout),
            "counter store operation timed out"
        );
    }
}
