//! In-memory counter store for testing and single-process development.
//!
//! Not suitable for production: counters live in process memory and provide
//! no cross-invocation consistency.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::ports::{CounterStore, CounterStoreError};

/// One counter with an optional expiry.
#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory counter store with lazy TTL expiry.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<i64, CounterStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: 0,
            expires_at: None,
        });
        if entry.is_expired(now) {
            // Expired counters restart; the TTL applies as if freshly created.
            *entry = Entry {
                value: 0,
                expires_at: None,
            };
        }

        entry.value += 1;
        if entry.value == 1 {
            entry.expires_at = ttl.map(|t| now + t);
        }

        Ok(entry.value)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, CounterStoreError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value))
    }

    async fn remove(&self, key: &str) -> Result<(), CounterStoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
