// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Shopdesk chat pipeline.
//!
//! Exposes [`shopdesk_agent::ChatPipeline`] as a streaming (SSE) and
//! single-shot chat endpoint, alongside quota diagnostics, the analytics
//! summary, the tool server and public health/metrics endpoints.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod sse;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
