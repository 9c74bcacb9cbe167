// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: positive limits, ordered quotas,
//! compilable patterns, and usable addresses. All problems are collected.

use crate::diagnostic::ConfigError;
use crate::model::{ShopdeskConfig, StoreBackend};

/// Validate a deserialized configuration, returning every problem found.
pub fn validate_config(config: &ShopdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let addr = config.server.bind_address.trim();
    if addr.is_empty() {
        errors.push(ConfigError::validation("server.bind_address must not be empty"));
    } else if addr.parse::<std::net::IpAddr>().is_err()
        && !addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.bind_address `{addr}` is not a valid IP address or hostname"
        )));
    }

    if config.server.event_buffer == 0 {
        errors.push(ConfigError::validation("server.event_buffer must be at least 1"));
    }

    if config.query.max_query_length == 0 {
        errors.push(ConfigError::validation("query.max_query_length must be at least 1"));
    }

    for (i, pattern) in config.query.blocked_patterns.iter().enumerate() {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(ConfigError::validation(format!(
                "query.blocked_patterns[{i}] `{pattern}` is not a valid regular expression: {e}"
            )));
        }
    }

    let rl = &config.rate_limit;
    if rl.requests_per_minute == 0 {
        errors.push(ConfigError::validation(
            "rate_limit.requests_per_minute must be at least 1",
        ));
    }
    if rl.requests_per_hour < rl.requests_per_minute {
        errors.push(ConfigError::validation(format!(
            "rate_limit.requests_per_hour ({}) must not be below rate_limit.requests_per_minute ({})",
            rl.requests_per_hour, rl.requests_per_minute
        )));
    }
    if rl.primary_timeout_ms == 0 || rl.usage_timeout_ms == 0 {
        errors.push(ConfigError::validation(
            "rate_limit timeouts must be greater than zero",
        ));
    }
    if rl.fallback_capacity < rl.requests_per_hour as usize {
        errors.push(ConfigError::validation(format!(
            "rate_limit.fallback_capacity ({}) must hold at least requests_per_hour ({}) entries",
            rl.fallback_capacity, rl.requests_per_hour
        )));
    }

    let cb = &config.circuit_breaker;
    if cb.rate_limiter_failure_threshold == 0 || cb.llm_failure_threshold == 0 {
        errors.push(ConfigError::validation(
            "circuit_breaker failure thresholds must be at least 1",
        ));
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ConfigError::validation("cache.ttl_secs must be at least 1"));
    }

    let base_url = config.llm.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "llm.base_url `{base_url}` must start with http:// or https://"
        )));
    }
    if config.llm.model.trim().is_empty() {
        errors.push(ConfigError::validation("llm.model must not be empty"));
    }

    if config.store.backend == StoreBackend::Redis && config.store.redis_url.trim().is_empty() {
        errors.push(ConfigError::validation(
            "store.redis_url must not be empty when store.backend is \"redis\"",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    if config.analytics.max_samples == 0 {
        errors.push(ConfigError::validation("analytics.max_samples must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
