// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` assembles a [`ChatPipeline`] over a temp SQLite database,
//! a controllable in-memory store, a mock LLM and either mock or real
//! catalog tools.

use std::sync::Arc;

use futures::StreamExt;
use shopdesk_agent::{ChatPipeline, PipelineDeps};
use shopdesk_config::ShopdeskConfig;
use shopdesk_config::model::StorageConfig;
use shopdesk_core::{
    Intent, MessageStore, PipelineEvent, PipelineResult, RequestContext, ShopdeskError,
    StoredMessage, ToolLayer, ToolName,
};
use shopdesk_storage::SqliteStorage;
use shopdesk_tools::SqliteTools;

use crate::flaky_store::FlakyStore;
use crate::mock_provider::MockProvider;
use crate::mock_tools::MockTools;

/// Classifier reply naming `intent`.
pub fn classification(intent: Intent) -> String {
    serde_json::json!({ "intent": intent }).to_string()
}

/// Generator reply with `narrative`, echoing a small data object and one KPI.
pub fn generation(narrative: &str) -> String {
    serde_json::json!({
        "narrative": narrative,
        "data": {"revenue": 180.0},
        "ui_components": [{"type": "kpi", "label": "Revenue", "value_key": "revenue"}],
    })
    .to_string()
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    config: ShopdeskConfig,
    catalog_tools: bool,
    failing_tools: Vec<ToolName>,
    panicking_tools: Vec<ToolName>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            config: ShopdeskConfig::default(),
            catalog_tools: false,
            failing_tools: Vec::new(),
            panicking_tools: Vec::new(),
        }
    }

    /// Set mock LLM replies, consumed in order.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Adjust the configuration the pipeline is built from.
    pub fn with_config(mut self, f: impl FnOnce(&mut ShopdeskConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Serve tools from the SQLite catalog instead of canned reports.
    pub fn with_catalog_tools(mut self) -> Self {
        self.catalog_tools = true;
        self
    }

    pub fn with_failing_tool(mut self, tool: ToolName) -> Self {
        self.failing_tools.push(tool);
        self
    }

    pub fn with_panicking_tool(mut self, tool: ToolName) -> Self {
        self.panicking_tools.push(tool);
        self
    }

    pub async fn build(self) -> Result<TestHarness, ShopdeskError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| ShopdeskError::Storage {
            source: Box::new(e),
        })?;
        let storage_config = StorageConfig {
            database_path: temp_dir.path().join("test.db").display().to_string(),
            wal_mode: true,
        };
        let storage = SqliteStorage::open(&storage_config).await?;

        let provider = Arc::new(MockProvider::with_responses(self.responses));
        let store = Arc::new(FlakyStore::new());
        let mock_tools = self
            .failing_tools
            .into_iter()
            .fold(MockTools::new(), MockTools::failing);
        let mock_tools = Arc::new(
            self.panicking_tools
                .into_iter()
                .fold(mock_tools, MockTools::panicking),
        );
        let tools: Arc<dyn ToolLayer> = if self.catalog_tools {
            Arc::new(SqliteTools::new(storage.database().clone()))
        } else {
            mock_tools.clone()
        };

        let mut config = self.config;
        config.storage = storage_config;
        let pipeline = ChatPipeline::new(
            &config,
            PipelineDeps {
                store: store.clone(),
                provider: provider.clone(),
                tools,
                messages: Arc::new(storage.clone()),
            },
        )?;

        Ok(TestHarness {
            pipeline,
            provider,
            store,
            tools: mock_tools,
            storage,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub pipeline: ChatPipeline,
    pub provider: Arc<MockProvider>,
    pub store: Arc<FlakyStore>,
    /// Unused when the harness was built with catalog tools.
    pub tools: Arc<MockTools>,
    pub storage: SqliteStorage,
    pub config: ShopdeskConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default config and no queued LLM replies.
    pub async fn new() -> Result<Self, ShopdeskError> {
        Self::builder().build().await
    }

    /// A context for `user_id` with read permission, in a session named after the user.
    pub fn context(user_id: &str) -> RequestContext {
        RequestContext::new(user_id, format!("session-{user_id}")).with_permissions(["read"])
    }

    /// Runs `query` and collects every event of its stream.
    pub async fn events(&self, query: &str, ctx: RequestContext) -> Vec<PipelineEvent> {
        self.pipeline.process_stream(query, ctx).collect().await
    }

    /// Runs `query` to completion and waits for persistence, caching and analytics.
    pub async fn ask(&self, query: &str, ctx: RequestContext) -> PipelineResult {
        let result = self.pipeline.process(query, ctx).await;
        self.pipeline.wait_for_background_tasks().await;
        result
    }

    pub async fn stored_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, ShopdeskError> {
        self.storage.messages_for_session(session_id).await
    }
}
