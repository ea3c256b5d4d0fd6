//! Redis-backed counter store for production deployments.
//!
//! INCR gives the atomic post-increment value; EXPIRE is applied only when
//! the increment created the key, so the window TTL is set once per window.
//! Every operation is bounded by the configured timeout so a slow Redis can
//! never hang an invocation past its execution budget.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;

use crate::ports::{CounterStore, CounterStoreError};

/// Counter store over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: MultiplexedConnection,
    op_timeout: Duration,
}

impl RedisCounterStore {
    /// Creates a store with a per-operation timeout.
    pub fn new(conn: MultiplexedConnection, op_timeout: Duration) -> Self {
        Self { conn, op_timeout }
    }

    /// Runs a Redis future under the operation timeout.
    async fn bounded<T, F>(&self, op: F) -> Result<T, CounterStoreError>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CounterStoreError::Unavailable(e.to_string())),
            Err(_) => Err(CounterStoreError::Timeout),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<i64, CounterStoreError> {
        let mut conn = self.conn.clone();

        let count: i64 = self.bounded(conn.incr(key, 1_i64)).await?;

        // First increment in a window sets the expiry.
        if count == 1 {
            if let Some(ttl) = ttl {
                let mut conn = self.conn.clone();
                self.bounded(conn.expire::<_, ()>(key, ttl.as_secs() as i64))
                    .await?;
            }
        }

        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, CounterStoreError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.get(key)).await
    }

    async fn remove(&self, key: &str) -> Result<(), CounterStoreError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.del::<_, ()>(key)).await
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}
