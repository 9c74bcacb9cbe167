// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.

use metrics::{describe_counter, describe_histogram};
use strum::{Display, IntoStaticStr};

/// How a chat request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RequestOutcome {
    Answered,
    Cached,
    Rejected,
    RateLimited,
    Failed,
}

/// Registers all Shopdesk metric descriptions.
pub fn register_metrics() {
    describe_counter!("shopdesk_chat_requests_total", "Chat requests by outcome");
    describe_histogram!(
        "shopdesk_chat_latency_seconds",
        "End-to-end chat pipeline latency in seconds"
    );
    describe_counter!(
        "shopdesk_rate_limit_fallback_total",
        "Rate limit checks served by the in-memory fallback"
    );
    describe_counter!("shopdesk_cache_hits_total", "Chat responses served from cache");
}

pub fn record_request(outcome: RequestOutcome) {
    let outcome: &'static str = outcome.into();
    metrics::counter!("shopdesk_chat_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_latency(seconds: f64) {
    metrics::histogram!("shopdesk_chat_latency_seconds").record(seconds);
}

pub fn record_rate_limit_fallback() {
    metrics::counter!("shopdesk_rate_limit_fallback_total").increment(1);
}

pub fn record_cache_hit() {
    metrics::counter!("shopdesk_cache_hits_total").increment(1);
}
