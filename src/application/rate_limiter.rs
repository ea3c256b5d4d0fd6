//! Fixed-window admission control over the shared counter store.
//!
//! Decisions for the same identity are linearized by the store's atomic
//! increment, never by application-level locking; decisions for different
//! identities are fully independent. If the store is unreachable the limiter
//! fails closed: the caller gets `Unavailable`, which is distinct from an
//! over-limit deny.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::config::{LimitsConfig, ResourceLimit};
use crate::domain::foundation::Timestamp;
use crate::ports::{CounterStore, CounterStoreError};

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Request admitted; includes remaining quota for the current window.
    Allowed {
        limit: u32,
        remaining: u32,
        reset_at: Timestamp,
        window_secs: u32,
    },
    /// Request over the threshold for the current window.
    Denied { limit: u32, retry_after_secs: u32 },
}

impl AdmissionDecision {
    /// Returns true if the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionDecision::Allowed { .. })
    }
}

/// Per-resource admit/deny totals since the counters were last reset.
///
/// Best-effort, eventually-consistent rollup; totals are read without any
/// lock that could block admission decisions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Resource name -> counters, in stable order for JSON output.
    pub resources: BTreeMap<String, ResourceMetrics>,
}

/// Counters for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceMetrics {
    /// All admission checks, admitted or not.
    pub requests: u64,
    /// Checks that were admitted.
    pub allowed: u64,
    /// Checks that were denied.
    pub denied: u64,
    /// Canonical usage recorded via `track_request`.
    pub tracked: u64,
}

/// Errors surfaced by the rate limiter.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// The resource name matches no deployed limiter definition.
    #[error("unknown rate limit resource: {0}")]
    UnknownResource(String),

    /// The identity string is empty.
    #[error("identity must not be empty")]
    InvalidIdentity,

    /// The counter store failed; admission fails closed.
    #[error("rate limiter unavailable: {0}")]
    Unavailable(#[from] CounterStoreError),
}

/// Fixed-window rate limiter shared by all invocations through the store.
pub struct RateLimitService {
    store: Arc<dyn CounterStore>,
    limits: LimitsConfig,
}

impl RateLimitService {
    /// Creates a limiter over a counter store and a definition registry.
    pub fn new(store: Arc<dyn CounterStore>, limits: LimitsConfig) -> Self {
        Self { store, limits }
    }

    /// Checks admission for `(resource, identity)`, consuming one slot.
    ///
    /// The window counter is incremented atomically before the threshold
    /// check; a denied request's increment is deliberately not rolled back,
    /// so a flood of denied retries cannot reset state. The boundary policy
    /// is admit-on-equal: the post-increment count must strictly exceed the
    /// threshold to be denied.
    pub async fn admit(
        &self,
        resource: &str,
        identity: &str,
    ) -> Result<AdmissionDecision, RateLimitError> {
        let limit = self.definition(resource)?;
        if identity.is_empty() {
            return Err(RateLimitError::InvalidIdentity);
        }

        let now = Timestamp::now();
        let window_start = window_start(now.as_unix_secs(), limit.window_secs);
        let key = window_key(resource, identity, window_start);
        let ttl = Duration::from_secs(u64::from(limit.window_secs));

        let count = self.store.increment(&key, Some(ttl)).await?;

        let reset_at = Timestamp::from_unix_secs(window_start + u64::from(limit.window_secs));
        let decision = if count > i64::from(limit.threshold) {
            self.bump_metric(resource, "requests").await;
            self.bump_metric(resource, "denied").await;
            AdmissionDecision::Denied {
                limit: limit.threshold,
                retry_after_secs: (reset_at.as_unix_secs().saturating_sub(now.as_unix_secs()))
                    .max(1) as u32,
            }
        } else {
            self.bump_metric(resource, "requests").await;
            self.bump_metric(resource, "allowed").await;
            AdmissionDecision::Allowed {
                limit: limit.threshold,
                remaining: limit.threshold.saturating_sub(count as u32),
                reset_at,
                window_secs: limit.window_secs,
            }
        };

        Ok(decision)
    }

    /// Records one canonical use of a resource.
    ///
    /// Separate from `admit` so a caller can gate first, do the work, and
    /// count only the billable event. Increments the same window-counter
    /// family that `admit` gates on.
    pub async fn track_request(&self, resource: &str, identity: &str) -> Result<(), RateLimitError> {
        let limit = self.definition(resource)?;
        if identity.is_empty() {
            return Err(RateLimitError::InvalidIdentity);
        }

        let window_start = window_start(Timestamp::now().as_unix_secs(), limit.window_secs);
        let key = window_key(resource, identity, window_start);
        let ttl = Duration::from_secs(u64::from(limit.window_secs));

        self.store.increment(&key, Some(ttl)).await?;
        self.bump_metric(resource, "tracked").await;
        Ok(())
    }

    /// Reads the per-resource metrics rollup for every deployed definition.
    ///
    /// A read failure for one counter degrades to zero rather than failing
    /// the whole snapshot.
    pub async fn metrics(&self) -> Result<MetricsSnapshot, RateLimitError> {
        let mut snapshot = MetricsSnapshot::default();

        for resource in self.limits.resource_names() {
            let metrics = ResourceMetrics {
                requests: self.read_metric(resource, "requests").await,
                allowed: self.read_metric(resource, "allowed").await,
                denied: self.read_metric(resource, "denied").await,
                tracked: self.read_metric(resource, "tracked").await,
            };
            snapshot.resources.insert(resource.to_string(), metrics);
        }

        Ok(snapshot)
    }

    /// Clears the current window for `(resource, identity)`. Admin/test hook.
    pub async fn reset(&self, resource: &str, identity: &str) -> Result<(), RateLimitError> {
        let limit = self.definition(resource)?;
        let window_start = window_start(Timestamp::now().as_unix_secs(), limit.window_secs);
        let key = window_key(resource, identity, window_start);
        self.store.remove(&key).await?;
        Ok(())
    }

    fn definition(&self, resource: &str) -> Result<ResourceLimit, RateLimitError> {
        self.limits
            .limit_for(resource)
            .ok_or_else(|| RateLimitError::UnknownResource(resource.to_string()))
    }

    /// Metric increments never fail an admission decision.
    async fn bump_metric(&self, resource: &str, counter: &str) {
        let key = metric_key(resource, counter);
        if let Err(e) = self.store.increment(&key, None).await {
            warn!(resource, counter, error = %e, "metric increment failed");
        }
    }

    async fn read_metric(&self, resource: &str, counter: &str) -> u64 {
        let key = metric_key(resource, counter);
        match self.store.get(&key).await {
            Ok(value) => value.unwrap_or(0).max(0) as u64,
            Err(e) => {
                warn!(resource, counter, error = %e, "metric read failed");
                0
            }
        }
    }
}

/// Window start: current time truncated to the window duration.
fn window_start(now_secs: u64, window_secs: u32) -> u64 {
    now_secs - now_secs % u64::from(window_secs)
}

fn window_key(resource: &str, identity: &str, window_start: u64) -> String {
    format!("ratelimit:{}:{}:{}", resource, identity, window_start)
}

fn metric_key(resource: &str, counter: &str) -> String {
    format!("metrics:{}:{}", resource, counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::counter_store::InMemoryCounterStore;
    use crate::config::ResourceLimit;
    use std::collections::HashMap;

    fn limits(threshold: u32, window_secs: u32) -> LimitsConfig {
        LimitsConfig {
            resources: HashMap::from([(
                "syncuser".to_string(),
                ResourceLimit {
                    threshold,
                    window_secs,
                },
            )]),
        }
    }

    fn service(threshold: u32) -> RateLimitService {
        RateLimitService::new(Arc::new(InMemoryCounterStore::new()), limits(threshold, 3600))
    }

    #[test]
    fn window_start_truncates_to_boundary() {
        assert_eq!(window_start(1_000, 60), 960);
        assert_eq!(window_start(960, 60), 960);
        assert_eq!(window_start(1_019, 60), 960);
        assert_eq!(window_start(1_020, 60), 1_020);
    }

    #[test]
    fn window_key_includes_all_parts() {
        assert_eq!(
            window_key("syncuser", "user-1", 960),
            "ratelimit:syncuser:user-1:960"
        );
    }

    #[tokio::test]
    async fn kth_request_is_admitted_and_k_plus_first_denied() {
        let service = service(3);

        for i in 0..3 {
            let decision = service.admit("syncuser", "user-1").await.unwrap();
            assert!(decision.is_allowed(), "request {} should be admitted", i + 1);
        }

        let decision = service.admit("syncuser", "user-1").await.unwrap();
        assert!(!decision.is_allowed(), "4th request should be denied");
    }

    #[tokio::test]
    async fn exact_threshold_request_reports_zero_remaining() {
        let service = service(2);

        service.admit("syncuser", "user-1").await.unwrap();
        let decision = service.admit("syncuser", "user-1").await.unwrap();

        match decision {
            AdmissionDecision::Allowed { remaining, .. } => assert_eq!(remaining, 0),
            AdmissionDecision::Denied { .. } => panic!("threshold request must be admitted"),
        }
    }

    #[tokio::test]
    async fn identities_are_independent() {
        let service = service(1);

        assert!(service.admit("syncuser", "a").await.unwrap().is_allowed());
        assert!(service.admit("syncuser", "b").await.unwrap().is_allowed());
        assert!(!service.admit("syncuser", "a").await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn unknown_resource_is_a_configuration_error() {
        let service = service(3);
        let err = service.admit("nope", "user-1").await.unwrap_err();
        assert!(matches!(err, RateLimitError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn empty_identity_is_rejected() {
        let service = service(3);
        let err = service.admit("syncuser", "").await.unwrap_err();
        assert!(matches!(err, RateLimitError::InvalidIdentity));
    }

    #[tokio::test]
    async fn denied_requests_still_count_in_metrics() {
        let service = service(1);

        service.admit("syncuser", "user-1").await.unwrap();
        service.admit("syncuser", "user-1").await.unwrap();
        service.admit("syncuser", "user-1").await.unwrap();

        let snapshot = service.metrics().await.unwrap();
        let metrics = snapshot.resources.get("syncuser").unwrap();
        assert_eq!(metrics.requests, 3);
        assert_eq!(metrics.allowed, 1);
        assert_eq!(metrics.denied, 2);
    }

    #[tokio::test]
    async fn metrics_totals_equal_sum_of_events() {
        let service = service(5);

        for i in 0..8 {
            let identity = format!("user-{}", i % 2);
            service.admit("syncuser", &identity).await.unwrap();
        }

        let snapshot = service.metrics().await.unwrap();
        let metrics = snapshot.resources.get("syncuser").unwrap();
        assert_eq!(metrics.requests, metrics.allowed + metrics.denied);
        assert_eq!(metrics.requests, 8);
    }

    #[tokio::test]
    async fn track_request_consumes_window_capacity() {
        let service = service(2);

        service.track_request("syncuser", "user-1").await.unwrap();
        service.track_request("syncuser", "user-1").await.unwrap();

        // The window is full; the next admit must be denied.
        let decision = service.admit("syncuser", "user-1").await.unwrap();
        assert!(!decision.is_allowed());

        let snapshot = service.metrics().await.unwrap();
        assert_eq!(snapshot.resources.get("syncuser").unwrap().tracked, 2);
    }

    #[tokio::test]
    async fn reset_restores_the_window() {
        let service = service(1);

        service.admit("syncuser", "user-1").await.unwrap();
        assert!(!service.admit("syncuser", "user-1").await.unwrap().is_allowed());

        service.reset("syncuser", "user-1").await.unwrap();
        assert!(service.admit("syncuser", "user-1").await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn store_failure_fails_closed_with_distinct_error() {
        struct BrokenStore;

        #[async_trait::async_trait]
        impl CounterStore for BrokenStore {
            async fn increment(
                &self,
                _key: &str,
                _ttl: Option<Duration>,
            ) -> Result<i64, CounterStoreError> {
                Err(CounterStoreError::Unavailable("down".to_string()))
            }

            async fn get(&self, _key: &str) -> Result<Option<i64>, CounterStoreError> {
                Err(CounterStoreError::Unavailable("down".to_string()))
            }

            async fn remove(&self, _key: &str) -> Result<(), CounterStoreError> {
                Err(CounterStoreError::Unavailable("down".to_string()))
            }
        }

        let service = RateLimitService::new(Arc::new(BrokenStore), limits(3, 60));
        let err = service.admit("syncuser", "user-1").await.unwrap_err();
        assert!(matches!(err, RateLimitError::Unavailable(_)));
    }

    #[tokio::test]
    async fn expired_window_resets_admission() {
        // 1-second window with a shared in-memory store: after the TTL the
        // counter is gone and admission starts over.
        let store = Arc::new(InMemoryCounterStore::new());
        let service = RateLimitService::new(store.clone(), limits(1, 1));

        // Admit until the window fills; a boundary crossing mid-test just
        // means one extra allowed request before the deny.
        let mut denied = false;
        for _ in 0..4 {
            if !service.admit("syncuser", "user-1").await.unwrap().is_allowed() {
                denied = true;
                break;
            }
        }
        assert!(denied, "window never filled");

        // Sleeping longer than the window guarantees a fresh window key.
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(service.admit("syncuser", "user-1").await.unwrap().is_allowed());
    }
}
