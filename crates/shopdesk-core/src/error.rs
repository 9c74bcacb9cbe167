// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Shopdesk chat pipeline.

use thiserror::Error;

/// The primary error type used across all Shopdesk adapter traits and pipeline stages.
#[derive(Debug, Error)]
pub enum ShopdeskError {
    /// The query was rejected by input validation (empty, too long, prohibited content).
    #[error("{0}")]
    Validation(String),

    /// The caller exceeded a request quota.
    #[error("{0}")]
    RateLimited(String),

    /// A data-retrieval handler failed for the classified intent.
    #[error("{message}")]
    DataFetch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors (API failure, malformed payload, non-success status).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Counter/cache store errors (connection failure, command failure).
    #[error("store error: {message}")]
    Store {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Durable storage errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A data tool rejected its arguments or failed while running.
    #[error("tool {tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// A circuit breaker refused the call without attempting it.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Configuration errors (invalid TOML, bad pattern, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShopdeskError {
    /// Creates a store error from any error source.
    pub fn store(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the error message is safe to show to the end user verbatim.
    ///
    /// Everything else is reported as an opaque server error.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::RateLimited(_) | Self::DataFetch { .. }
        )
    }
}
