// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod provider;
pub mod storage;
pub mod store;
pub mod tools;

pub use adapter::PluginAdapter;
pub use provider::LlmProvider;
pub use storage::MessageStore;
pub use store::KeyValueStore;
pub use tools::ToolLayer;
