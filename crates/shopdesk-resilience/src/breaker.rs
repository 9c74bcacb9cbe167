// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consecutive-failure circuit breaker.
//!
//! Closed until `failure_threshold` consecutive failures, then open for
//! `recovery_timeout`. After that a single probe is let through (half-open):
//! success closes the breaker and clears the failure count, failure re-opens it.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use shopdesk_core::ShopdeskError;
use strum::Display;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Point-in-time view of a breaker, for diagnostics endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    /// Seconds until an open breaker admits its probe. `None` unless open.
    pub retry_in_secs: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    /// When the half-open probe was admitted.
    probe_started: Option<Instant>,
}

/// A process-local circuit breaker guarding one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                probe_started: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Whether the next call may go through.
    ///
    /// An open breaker whose recovery timeout has elapsed moves to half-open
    /// and admits exactly one probe. A probe that never reports back is
    /// considered lost after another recovery timeout.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        let now = Instant::now();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| now.duration_since(t))
                    .unwrap_or(self.config.recovery_timeout);
                if elapsed >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_started = Some(now);
                    info!(breaker = %self.name, "circuit breaker half-open, admitting probe");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => match inner.probe_started {
                Some(started) if now.duration_since(started) < self.config.recovery_timeout => {
                    false
                }
                _ => {
                    inner.probe_started = Some(now);
                    true
                }
            },
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(breaker = %self.name, "circuit breaker closed");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.probe_started = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());
        inner.probe_started = None;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                warn!(breaker = %self.name, "probe failed, circuit breaker re-opened");
            }
            CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                inner.state = CircuitState::Open;
                warn!(
                    breaker = %self.name,
                    failures = inner.failure_count,
                    "circuit breaker opened"
                );
            }
            _ => {}
        }
    }

    /// Runs `f` through the breaker, recording its outcome.
    ///
    /// Fails with [`ShopdeskError::CircuitOpen`] without running `f` while open.
    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T, ShopdeskError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ShopdeskError>>,
    {
        if !self.allow_request() {
            return Err(ShopdeskError::CircuitOpen {
                name: self.name.clone(),
            });
        }
        let outcome = f().await;
        match &outcome {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        outcome
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let retry_in_secs = match (inner.state, inner.last_failure) {
            (CircuitState::Open, Some(last)) => Some(
                self.config
                    .recovery_timeout
                    .saturating_sub(last.elapsed())
                    .as_secs(),
            ),
            _ => None,
        };
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.config.failure_threshold,
            retry_in_secs,
        }
    }

    /// Forces the breaker closed and clears its history.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure = None;
        inner.probe_started = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout: Duration::from_secs(60),
            },
        )
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let b = breaker(3);
        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.allow_request());
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.allow_request());
    }

    #[test]
    fn success_resets_failure_streak() {
        let b = breaker(3);
        b.record_failure();
        b.record_failure();
        b.record_success();
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.failure_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_admits_a_single_probe() {
        let b = breaker(1);
        b.record_failure();
        assert!(!b.allow_request());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(b.allow_request(), "probe admitted after recovery timeout");
        assert_eq!(b.state(), CircuitState::HalfOpen);
        assert!(!b.allow_request(), "second caller refused while probe runs");

        b.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.failure_count(), 0);
        assert!(b.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_reopens() {
        let b = breaker(2);
        b.record_failure();
        b.record_failure();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(b.allow_request());
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.allow_request());
        assert_eq!(b.snapshot().retry_in_secs, Some(60));
    }

    #[tokio::test(start_paused = true)]
    async fn lost_probe_is_replaced_after_timeout() {
        let b = breaker(1);
        b.record_failure();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(b.allow_request());
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(b.allow_request());
    }

    #[tokio::test]
    async fn call_short_circuits_while_open() {
        let b = breaker(1);
        let err = b
            .call(|| async { Err::<(), _>(ShopdeskError::provider("down")) })
            .await
            .unwrap_err();
        assert!(matches!(err, ShopdeskError::Provider { .. }));

        let mut ran = false;
        let err = b
            .call(|| {
                ran = true;
                async { Ok(()) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ShopdeskError::CircuitOpen { ref name } if name == "test"));
        assert!(!ran);
    }

    #[test]
    fn snapshot_reports_threshold_and_state() {
        let b = breaker(5);
        b.record_failure();
        let snap = b.snapshot();
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.failure_threshold, 5);
        assert_eq!(snap.retry_in_secs, None);
        assert_eq!(snap.state.to_string(), "closed");
    }

    #[test]
    fn reset_closes_an_open_breaker() {
        let b = breaker(1);
        b.record_failure();
        b.reset();
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.allow_request());
    }
}
