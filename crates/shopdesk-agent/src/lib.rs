// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat query pipeline for the Shopdesk analytics assistant.
//!
//! A query passes through these stages, in order:
//! - [`QueryValidator`] checks length, the injection blocklist and permissions
//! - [`RateLimiter`] enforces per-user quotas, falling back to memory when the store is down
//! - [`ResponseCache`] short-circuits repeated questions
//! - [`ResponseGenerator`] classifies the intent and later writes the answer
//! - [`DataFetcher`] calls the data tool for the intent
//!
//! [`ChatPipeline`] wires them together and streams progress events.

pub mod analytics;
pub mod cache;
pub mod confidence;
pub mod fetcher;
pub mod generator;
pub mod health;
pub mod pipeline;
pub mod rate_limiter;
pub mod validator;

pub use analytics::{AnalyticsSummary, AnalyticsTracker};
pub use cache::ResponseCache;
pub use confidence::{ConfidencePolicy, DefaultConfidence};
pub use fetcher::DataFetcher;
pub use generator::{GeneratedResponse, ResponseGenerator, UiComponent};
pub use health::HealthReport;
pub use pipeline::{ChatPipeline, PipelineDeps};
pub use rate_limiter::{RateLimiter, UsageReport};
pub use validator::QueryValidator;
