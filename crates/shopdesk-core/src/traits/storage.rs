// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable conversation storage trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ShopdeskError;
use crate::traits::adapter::PluginAdapter;

/// One persisted question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub session_id: String,
    pub query: String,
    pub response: String,
    pub intent: String,
    pub execution_time: f64,
    pub confidence: f64,
    /// Structured response plus the permissions the question was asked with.
    pub metadata: serde_json::Value,
    pub created_at: String,
}

/// Durable store for chat sessions and their messages.
#[async_trait]
pub trait MessageStore: PluginAdapter {
    /// Creates the session if it does not exist yet. Existing sessions keep their owner.
    async fn ensure_session(&self, session_id: &str, user_id: &str) -> Result<(), ShopdeskError>;

    async fn append_message(&self, message: &StoredMessage) -> Result<(), ShopdeskError>;

    /// Messages of a session, oldest first.
    async fn messages_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<StoredMessage>, ShopdeskError>;
}
