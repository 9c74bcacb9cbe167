// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A key-value store that can be told to fail or stall.
//!
//! Wraps [`MemoryStore`] so behavior is realistic while healthy.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use shopdesk_core::{
    AdapterType, Admission, BatchOp, BoundedCounter, HealthStatus, KeyValueStore, PluginAdapter,
    ShopdeskError,
};
use shopdesk_store::MemoryStore;

#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every operation by `delay` before it runs.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Number of store operations attempted, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), ShopdeskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShopdeskError::Store {
                message: "connection refused".into(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopdeskError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("connection refused".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), ShopdeskError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ShopdeskError> {
        self.gate().await?;
        self.inner.get(key).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, ShopdeskError> {
        self.gate().await?;
        self.inner.get_many(keys).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ShopdeskError> {
        self.gate().await?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ShopdeskError> {
        self.gate().await?;
        self.inner.delete(keys).await
    }

    async fn admit(&self, counters: &[BoundedCounter]) -> Result<Admission, ShopdeskError> {
        self.gate().await?;
        self.inner.admit(counters).await
    }

    async fn execute(&self, ops: Vec<BatchOp>) -> Result<(), ShopdeskError> {
        self.gate().await?;
        self.inner.execute(ops).await
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, ShopdeskError> {
        self.gate().await?;
        self.inner.list_range(key, start, stop).await
    }
}
