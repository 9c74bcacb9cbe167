// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Shopdesk chat pipeline.
//!
//! This crate provides the trait definitions, error type, and domain types
//! used throughout the Shopdesk workspace. Every backend the pipeline talks
//! to (counter store, LLM provider, data tools, durable storage) implements a
//! trait defined here and is injected at startup.

pub mod error;
pub mod event;
pub mod result;
pub mod traits;
pub mod types;

pub use error::ShopdeskError;
pub use event::PipelineEvent;
pub use result::PipelineResult;
pub use types::{AdapterType, HealthStatus, Intent, RequestContext};

pub use traits::provider::{ChatMessage, CompletionRequest, CompletionResponse, Role, TokenUsage};
pub use traits::storage::StoredMessage;
pub use traits::store::{Admission, BatchOp, BoundedCounter};
pub use traits::tools::ToolName;
pub use traits::{KeyValueStore, LlmProvider, MessageStore, PluginAdapter, ToolLayer};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn adapter_type_round_trips_through_strings() {
        let variants = [
            AdapterType::Store,
            AdapterType::Provider,
            AdapterType::Tools,
            AdapterType::Storage,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn health_status_labels() {
        assert_eq!(HealthStatus::Healthy.label(), "healthy");
        assert_eq!(HealthStatus::Degraded("slow".into()).label(), "degraded");
        assert_eq!(HealthStatus::Unhealthy("down".into()).label(), "unhealthy");
    }

    #[test]
    fn traits_are_object_safe() {
        fn _store(_: &dyn KeyValueStore) {}
        fn _provider(_: &dyn LlmProvider) {}
        fn _tools(_: &dyn ToolLayer) {}
        fn _messages(_: &dyn MessageStore) {}
    }
}
