// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store trait for counters, cached responses, and analytics.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ShopdeskError;
use crate::traits::adapter::PluginAdapter;

/// A counter that may only be incremented while it is below `limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedCounter {
    pub key: String,
    pub limit: u64,
    /// Expiry applied after each increment.
    pub ttl: Duration,
}

/// Outcome of an atomic check-then-increment over a set of counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Every counter was below its limit and all were incremented.
    Admitted,
    /// The counter at `index` was already at `count >= limit`; nothing was incremented.
    Rejected { index: usize, count: u64, limit: u64 },
}

/// A single write in a batch submitted with [`KeyValueStore::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Incr { key: String },
    Expire { key: String, ttl: Duration },
    LPush { key: String, value: String },
    /// Keeps only list elements `start..=stop` (Redis LTRIM semantics).
    LTrim { key: String, start: isize, stop: isize },
}

/// Shared fast store used for rate-limit counters, the response cache and
/// usage analytics.
#[async_trait]
pub trait KeyValueStore: PluginAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>, ShopdeskError>;

    /// Reads several keys at once; missing keys come back as `None`.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, ShopdeskError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ShopdeskError>;

    async fn delete(&self, keys: &[String]) -> Result<(), ShopdeskError>;

    /// Atomically checks every counter against its limit and, only if all
    /// are below, increments each and refreshes its expiry.
    async fn admit(&self, counters: &[BoundedCounter]) -> Result<Admission, ShopdeskError>;

    /// Applies a batch of writes in one round trip.
    async fn execute(&self, ops: Vec<BatchOp>) -> Result<(), ShopdeskError>;

    /// Returns list elements `start..=stop` (negative indexes count from the end).
    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, ShopdeskError>;
}
