// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate limiter failover between the shared store and the local fallback.

use std::sync::Arc;
use std::time::Duration;

use shopdesk_agent::RateLimiter;
use shopdesk_agent::rate_limiter::UsageSource;
use shopdesk_config::model::RateLimitConfig;
use shopdesk_core::{RequestContext, ShopdeskError};
use shopdesk_resilience::{CircuitBreakerConfig, CircuitState};
use shopdesk_test_utils::FlakyStore;

fn limiter(store: Arc<FlakyStore>, config: RateLimitConfig) -> RateLimiter {
    RateLimiter::new(
        store,
        &config,
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
        },
    )
}

fn ctx() -> RequestContext {
    RequestContext::new("u1", "s1")
}

#[tokio::test(start_paused = true)]
async fn breaker_opens_after_three_failures_and_recovers() {
    let store = Arc::new(FlakyStore::new());
    let limiter = limiter(store.clone(), RateLimitConfig::default());
    store.set_failing(true);

    for _ in 0..3 {
        limiter.check_limits(&ctx()).await.unwrap();
    }
    let status = limiter.circuit_breaker_status();
    assert_eq!(status.breaker.state, CircuitState::Open);
    assert_eq!(status.breaker.failure_count, 3);
    assert_eq!(status.fallback_keys, 1);
    assert_eq!(store.calls(), 3);

    // While open the store is not consulted at all.
    limiter.check_limits(&ctx()).await.unwrap();
    assert_eq!(store.calls(), 3);

    store.set_failing(false);
    tokio::time::advance(Duration::from_secs(61)).await;
    limiter.check_limits(&ctx()).await.unwrap();
    assert_eq!(store.calls(), 4);
    let status = limiter.circuit_breaker_status();
    assert_eq!(status.breaker.state, CircuitState::Closed);
    assert_eq!(status.breaker.failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_into_fallback() {
    let store = Arc::new(FlakyStore::new());
    store.set_delay(Some(Duration::from_secs(10)));
    let limiter = limiter(
        store,
        RateLimitConfig {
            requests_per_minute: 1,
            requests_per_hour: 100,
            primary_timeout_ms: 100,
            ..RateLimitConfig::default()
        },
    );

    limiter.check_limits(&ctx()).await.unwrap();
    let err = limiter.check_limits(&ctx()).await.unwrap_err();
    assert!(
        matches!(&err, ShopdeskError::RateLimited(m) if m.ends_with("(fallback)")),
        "{err:?}"
    );
    assert_eq!(limiter.circuit_breaker_status().breaker.failure_count, 2);
}

#[tokio::test(start_paused = true)]
async fn fallback_applies_the_per_minute_limit() {
    let store = Arc::new(FlakyStore::new());
    store.set_failing(true);
    let limiter = limiter(
        store,
        RateLimitConfig {
            requests_per_minute: 3,
            requests_per_hour: 100,
            ..RateLimitConfig::default()
        },
    );
    for _ in 0..3 {
        limiter.check_limits(&ctx()).await.unwrap();
    }
    assert!(matches!(
        limiter.check_limits(&ctx()).await,
        Err(ShopdeskError::RateLimited(_))
    ));

    let usage = limiter.get_current_usage(&ctx()).await;
    assert_eq!(usage.source, UsageSource::Fallback);
    assert_eq!(usage.minute_usage, 3);
    assert_eq!(usage.minute_remaining, 0);
    assert_eq!(usage.circuit_breaker_state, CircuitState::Open);
}

#[tokio::test]
async fn usage_read_reports_primary_counts() {
    let store = Arc::new(FlakyStore::new());
    let limiter = limiter(store, RateLimitConfig::default());
    limiter.check_limits(&ctx()).await.unwrap();
    let usage = limiter.get_current_usage(&ctx()).await;
    assert_eq!(usage.source, UsageSource::Primary);
    assert!(usage.hour_usage >= 1);
    assert_eq!(usage.failure_count, 0);
}
