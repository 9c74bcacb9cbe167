// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user request quotas over fixed minute and hour buckets.
//!
//! The shared store is the source of truth. When it is slow or failing, a
//! circuit breaker routes checks to an in-process sliding window so limits
//! keep applying on this node.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use shopdesk_config::model::RateLimitConfig;
use shopdesk_core::{Admission, BoundedCounter, KeyValueStore, RequestContext, ShopdeskError};
use shopdesk_resilience::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Where a usage report was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageSource {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub minute_usage: u64,
    pub minute_limit: u64,
    pub minute_remaining: u64,
    pub hour_usage: u64,
    pub hour_limit: u64,
    pub hour_remaining: u64,
    pub source: UsageSource,
    pub circuit_breaker_state: CircuitState,
    pub failure_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimiterStatus {
    #[serde(flatten)]
    pub breaker: BreakerSnapshot,
    /// Keys currently tracked by the in-process fallback.
    pub fallback_keys: usize,
}

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    per_minute: u64,
    per_hour: u64,
    primary_timeout: Duration,
    usage_timeout: Duration,
    fallback_capacity: usize,
    breaker: CircuitBreaker,
    fallback: Mutex<FallbackWindows>,
}

/// Request instants per key for the in-process fallback.
#[derive(Debug)]
struct FallbackWindows {
    windows: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl FallbackWindows {
    fn new() -> Self {
        Self {
            windows: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }

    /// Drops keys with no request in the trailing hour, at most once a minute.
    fn sweep(&mut self, now: Instant) {
        if now.duration_since(self.last_sweep) < MINUTE {
            return;
        }
        self.last_sweep = now;
        let before = self.windows.len();
        self.windows
            .retain(|_, window| window.back().is_some_and(|t| now.duration_since(*t) < HOUR));
        let evicted = before - self.windows.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.windows.len(), "evicted idle fallback windows");
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("per_minute", &self.per_minute)
            .field("per_hour", &self.per_hour)
            .field("breaker", &self.breaker.state())
            .finish_non_exhaustive()
    }
}

fn bucket_keys(key: &str) -> [String; 2] {
    let now = chrono::Utc::now().timestamp();
    [
        format!("rate_limit:min:{key}:{}", now / 60),
        format!("rate_limit:hour:{key}:{}", now / 3600),
    ]
}

fn exceeded(count: u64, limit: u64, window: &str, suffix: &str) -> ShopdeskError {
    ShopdeskError::RateLimited(format!(
        "Rate limit exceeded: {count}/{limit} requests per {window}{suffix}"
    ))
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        config: &RateLimitConfig,
        breaker: CircuitBreakerConfig,
    ) -> Self {
        Self {
            store,
            per_minute: config.requests_per_minute,
            per_hour: config.requests_per_hour,
            primary_timeout: Duration::from_millis(config.primary_timeout_ms),
            usage_timeout: Duration::from_millis(config.usage_timeout_ms),
            fallback_capacity: config.fallback_capacity.max(1),
            breaker: CircuitBreaker::new("rate_limiter", breaker),
            fallback: Mutex::new(FallbackWindows::new()),
        }
    }

    fn fallback(&self) -> MutexGuard<'_, FallbackWindows> {
        self.fallback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits the request or fails with [`ShopdeskError::RateLimited`].
    pub async fn check_limits(&self, ctx: &RequestContext) -> Result<(), ShopdeskError> {
        let key = ctx.rate_limit_key();
        match self.breaker.call(|| self.admit_primary(key)).await {
            Ok(Admission::Admitted) => Ok(()),
            Ok(Admission::Rejected {
                index,
                count,
                limit,
            }) => {
                let window = if index == 0 { "minute" } else { "hour" };
                info!(user_id = ctx.user_id(), window, count, limit, "rate limit exceeded");
                Err(exceeded(count, limit, window, ""))
            }
            Err(e) => {
                warn!(
                    user_id = ctx.user_id(),
                    error = %e,
                    "primary rate limit check unavailable, using fallback"
                );
                shopdesk_prometheus::record_rate_limit_fallback();
                self.check_fallback(key)
            }
        }
    }

    async fn admit_primary(&self, key: &str) -> Result<Admission, ShopdeskError> {
        let [minute_key, hour_key] = bucket_keys(key);
        let counters = [
            BoundedCounter {
                key: minute_key,
                limit: self.per_minute,
                ttl: MINUTE,
            },
            BoundedCounter {
                key: hour_key,
                limit: self.per_hour,
                ttl: HOUR,
            },
        ];
        tokio::time::timeout(self.primary_timeout, self.store.admit(&counters))
            .await
            .map_err(|_| ShopdeskError::Timeout {
                duration: self.primary_timeout,
            })?
    }

    fn check_fallback(&self, key: &str) -> Result<(), ShopdeskError> {
        let now = Instant::now();
        let mut fallback = self.fallback();
        fallback.sweep(now);
        let window = fallback.windows.entry(key.to_string()).or_default();
        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= HOUR)
        {
            window.pop_front();
        }

        let minute_count = window
            .iter()
            .filter(|t| now.duration_since(**t) < MINUTE)
            .count() as u64;
        if minute_count >= self.per_minute {
            return Err(exceeded(minute_count, self.per_minute, "minute", " (fallback)"));
        }
        let hour_count = window.len() as u64;
        if hour_count >= self.per_hour {
            return Err(exceeded(hour_count, self.per_hour, "hour", " (fallback)"));
        }

        window.push_back(now);
        while window.len() > self.fallback_capacity {
            window.pop_front();
        }
        Ok(())
    }

    fn fallback_counts(&self, key: &str) -> (u64, u64) {
        let now = Instant::now();
        self.fallback()
            .windows
            .get(key)
            .map(|window| {
                let minute = window
                    .iter()
                    .filter(|t| now.duration_since(**t) < MINUTE)
                    .count() as u64;
                let hour = window
                    .iter()
                    .filter(|t| now.duration_since(**t) < HOUR)
                    .count() as u64;
                (minute, hour)
            })
            .unwrap_or((0, 0))
    }

    async fn read_primary(&self, key: &str) -> Result<(u64, u64), ShopdeskError> {
        let keys = bucket_keys(key).to_vec();
        let values = tokio::time::timeout(self.usage_timeout, self.store.get_many(&keys))
            .await
            .map_err(|_| ShopdeskError::Timeout {
                duration: self.usage_timeout,
            })??;
        let count = |i: usize| -> u64 {
            values
                .get(i)
                .and_then(|v| v.as_deref())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };
        Ok((count(0), count(1)))
    }

    /// Current consumption against both limits.
    pub async fn get_current_usage(&self, ctx: &RequestContext) -> UsageReport {
        let key = ctx.rate_limit_key();
        let ((minute_usage, hour_usage), source) =
            match self.breaker.call(|| self.read_primary(key)).await {
                Ok(counts) => (counts, UsageSource::Primary),
                Err(e) => {
                    debug!(user_id = ctx.user_id(), error = %e, "usage read served from fallback");
                    (self.fallback_counts(key), UsageSource::Fallback)
                }
            };
        UsageReport {
            minute_usage,
            minute_limit: self.per_minute,
            minute_remaining: self.per_minute.saturating_sub(minute_usage),
            hour_usage,
            hour_limit: self.per_hour,
            hour_remaining: self.per_hour.saturating_sub(hour_usage),
            source,
            circuit_breaker_state: self.breaker.state(),
            failure_count: self.breaker.failure_count(),
        }
    }

    /// Clears the caller's counters in both the store and the fallback.
    pub async fn reset_user_limits(&self, ctx: &RequestContext) -> bool {
        let key = ctx.rate_limit_key();
        let keys = bucket_keys(key).to_vec();
        match tokio::time::timeout(self.usage_timeout, self.store.delete(&keys)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(user_id = ctx.user_id(), error = %e, "failed to clear primary rate limit counters"),
            Err(_) => warn!(user_id = ctx.user_id(), "timed out clearing primary rate limit counters"),
        }
        self.fallback().windows.remove(key);
        info!(user_id = ctx.user_id(), "rate limits reset");
        true
    }

    pub fn circuit_breaker_status(&self) -> RateLimiterStatus {
        let fallback_keys = {
            let mut fallback = self.fallback();
            fallback.sweep(Instant::now());
            fallback.windows.len()
        };
        RateLimiterStatus {
            breaker: self.breaker.snapshot(),
            fallback_keys,
        }
    }
}
