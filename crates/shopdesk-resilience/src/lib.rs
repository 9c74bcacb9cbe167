// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for Shopdesk.
//!
//! Each guarded dependency (the rate limiter's store path, intent
//! classification, response generation) owns its own [`CircuitBreaker`].
//! Breaker state is process-local.

pub mod breaker;

pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
