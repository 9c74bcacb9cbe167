// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress events emitted while a query is processed.

use serde::{Deserialize, Serialize};

use crate::result::PipelineResult;
use crate::types::Intent;

/// One frame of the pipeline's event stream.
///
/// Serializes as `{"event": "<name>", "data": {...}}`. Every stream ends with
/// exactly one [`PipelineEvent::FinalResponse`] or [`PipelineEvent::Error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PipelineEvent {
    StatusUpdate { message: String },
    IntentClassified { intent: Intent },
    DataFetched { data_summary: String },
    FinalResponse(PipelineResult),
    Error { message: String },
}

impl PipelineEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::StatusUpdate {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The event name used on the wire (`event:` line in SSE).
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusUpdate { .. } => "status_update",
            Self::IntentClassified { .. } => "intent_classified",
            Self::DataFetched { .. } => "data_fetched",
            Self::FinalResponse(_) => "final_response",
            Self::Error { .. } => "error",
        }
    }

    /// Serializes only the payload part of the event.
    pub fn data_json(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(mut value) => value
                .get_mut("data")
                .map(serde_json::Value::take)
                .unwrap_or(serde_json::Value::Null),
            Err(_) => serde_json::Value::Null,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalResponse(_) | Self::Error { .. })
    }
}
