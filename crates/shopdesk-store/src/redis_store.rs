// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed [`KeyValueStore`].
//!
//! Plain reads and writes share one multiplexed connection. Counter admission
//! uses WATCH/MULTI/EXEC, which needs connection-local state, so each
//! admission checks out a dedicated connection from a small idle pool and
//! returns it only after a clean transaction.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use shopdesk_core::{
    AdapterType, Admission, BatchOp, BoundedCounter, HealthStatus, KeyValueStore, PluginAdapter,
    ShopdeskError,
};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

fn store_err(op: &str, e: redis::RedisError) -> ShopdeskError {
    ShopdeskError::store(format!("redis {op} failed"), e)
}

/// Idle transaction connections kept for reuse.
const TRANSACTION_POOL_SIZE: usize = 8;

/// Bounded stack of idle connections. Each entry is owned by one caller at a time.
#[derive(Debug)]
struct IdlePool<T> {
    idle: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T> IdlePool<T> {
    fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    fn take(&self) -> Option<T> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }

    /// Returns `item` to the pool, dropping it when the pool is full.
    fn put(&self, item: T) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.capacity {
            idle.push(item);
        }
    }

    fn len(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Expiry in whole seconds, never zero (Redis rejects `EXPIRE key 0` as delete).
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

pub struct RedisStore {
    client: redis::Client,
    shared: OnceCell<MultiplexedConnection>,
    transactions: IdlePool<MultiplexedConnection>,
    transaction_retries: u32,
}

impl RedisStore {
    /// Creates a store for `url`. No connection is made until first use.
    pub fn new(url: &str, transaction_retries: u32) -> Result<Self, ShopdeskError> {
        let client = redis::Client::open(url)
            .map_err(|e| ShopdeskError::Config(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            shared: OnceCell::new(),
            transactions: IdlePool::new(TRANSACTION_POOL_SIZE),
            transaction_retries: transaction_retries.max(1),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, ShopdeskError> {
        self.shared
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| store_err("connect", e))
            })
            .await
            .cloned()
    }

    async fn transaction_connection(&self) -> Result<MultiplexedConnection, ShopdeskError> {
        if let Some(conn) = self.transactions.take() {
            return Ok(conn);
        }
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| store_err("connect", e))
    }

    async fn admit_on(
        &self,
        conn: &mut MultiplexedConnection,
        keys: &[&str],
        counters: &[BoundedCounter],
    ) -> Result<Admission, ShopdeskError> {
        for attempt in 1..=self.transaction_retries {
            if let Some(admission) = self.try_admit(conn, keys, counters).await? {
                return Ok(admission);
            }
            debug!(attempt, "counter transaction conflicted, retrying");
        }

        warn!(
            retries = self.transaction_retries,
            "counter transaction kept conflicting"
        );
        Err(ShopdeskError::Store {
            message: "counter transaction aborted by concurrent writes".into(),
            source: None,
        })
    }

    /// One optimistic attempt. `Ok(None)` means EXEC was aborted by a concurrent write.
    async fn try_admit(
        &self,
        conn: &mut MultiplexedConnection,
        keys: &[&str],
        counters: &[BoundedCounter],
    ) -> Result<Option<Admission>, ShopdeskError> {
        redis::cmd("WATCH")
            .arg(keys)
            .query_async::<_, ()>(conn)
            .await
            .map_err(|e| store_err("WATCH", e))?;

        let counts: Vec<Option<u64>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(conn)
            .await
            .map_err(|e| store_err("MGET", e))?;

        for (index, (count, counter)) in counts.iter().zip(counters).enumerate() {
            let count = count.unwrap_or(0);
            if count >= counter.limit {
                redis::cmd("UNWATCH")
                    .query_async::<_, ()>(conn)
                    .await
                    .map_err(|e| store_err("UNWATCH", e))?;
                return Ok(Some(Admission::Rejected {
                    index,
                    count,
                    limit: counter.limit,
                }));
            }
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for counter in counters {
            pipe.cmd("INCR").arg(&counter.key).ignore();
            pipe.cmd("EXPIRE")
                .arg(&counter.key)
                .arg(ttl_secs(counter.ttl))
                .ignore();
        }
        let committed: Option<()> = pipe
            .query_async(conn)
            .await
            .map_err(|e| store_err("EXEC", e))?;
        Ok(committed.map(|()| Admission::Admitted))
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("connected", &self.shared.initialized())
            .field("idle_transaction_connections", &self.transactions.len())
            .finish()
    }
}

#[async_trait]
impl PluginAdapter for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopdeskError> {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("PING failed: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), ShopdeskError> {
        debug!("redis store shutting down");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ShopdeskError> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_err("GET", e))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, ShopdeskError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_err("MGET", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ShopdeskError> {
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| store_err("SET", e))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ShopdeskError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(keys)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| store_err("DEL", e))
    }

    async fn admit(&self, counters: &[BoundedCounter]) -> Result<Admission, ShopdeskError> {
        if counters.is_empty() {
            return Ok(Admission::Admitted);
        }
        let keys: Vec<&str> = counters.iter().map(|c| c.key.as_str()).collect();
        let mut conn = self.transaction_connection().await?;
        let admission = self.admit_on(&mut conn, &keys, counters).await;
        // A failed or cancelled transaction may leave a WATCH behind; drop that connection.
        if admission.is_ok() {
            self.transactions.put(conn);
        }
        admission
    }

    async fn execute(&self, ops: Vec<BatchOp>) -> Result<(), ShopdeskError> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for op in &ops {
            match op {
                BatchOp::Incr { key } => pipe.cmd("INCR").arg(key).ignore(),
                BatchOp::Expire { key, ttl } => {
                    pipe.cmd("EXPIRE").arg(key).arg(ttl_secs(*ttl)).ignore()
                }
                BatchOp::LPush { key, value } => pipe.cmd("LPUSH").arg(key).arg(value).ignore(),
                BatchOp::LTrim { key, start, stop } => {
                    pipe.cmd("LTRIM").arg(key).arg(*start).arg(*stop).ignore()
                }
            };
        }
        let mut conn = self.connection().await?;
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| store_err("pipeline", e))
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, ShopdeskError> {
        let mut conn = self.connection().await?;
        redis::cmd("LRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_err("LRANGE", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_a_config_error() {
        let err = RedisStore::new("not a url", 3).unwrap_err();
        assert!(matches!(err, ShopdeskError::Config(_)));
    }

    #[test]
    fn ttl_is_at_least_one_second() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(3600)), 3600);
    }

    #[test]
    fn idle_pool_reuses_and_caps_entries() {
        let pool = IdlePool::new(2);
        assert!(pool.take().is_none());
        pool.put(1);
        pool.put(2);
        pool.put(3);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.take(), Some(2));
        assert_eq!(pool.take(), Some(1));
        assert!(pool.take().is_none());
    }

    #[tokio::test]
    async fn unreachable_server_reports_unhealthy() {
        let store = RedisStore::new("redis://127.0.0.1:1/0", 3).unwrap();
        let status = store.health_check().await.unwrap();
        assert!(matches!(status, HealthStatus::Unhealthy(_)));
        assert!(store.get("k").await.is_err());

        let counters = [BoundedCounter {
            key: "rate_limit:min:user:u1:1".into(),
            limit: 10,
            ttl: Duration::from_secs(60),
        }];
        assert!(store.admit(&counters).await.is_err());
        assert_eq!(store.transactions.len(), 0);
    }
}
