// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Shopdesk integration tests.
//!
//! Provides mock adapters and a harness for fast, deterministic tests
//! without Redis or an LLM endpoint.
//!
//! # Components
//!
//! - [`MockProvider`] - LLM provider with queued replies and failures
//! - [`MockTools`] - tool layer with canned reports and call recording
//! - [`FlakyStore`] - in-memory store that can be made to fail or stall
//! - [`TestHarness`] - a full pipeline over temp SQLite

pub mod flaky_store;
pub mod harness;
pub mod mock_provider;
pub mod mock_tools;

pub use flaky_store::FlakyStore;
pub use harness::{TestHarness, classification, generation};
pub use mock_provider::MockProvider;
pub use mock_tools::MockTools;
