// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup wiring: opens every backend named by the configuration and
//! injects them into the pipeline.

use std::sync::Arc;
use std::time::Duration;

use shopdesk_agent::{AnalyticsTracker, ChatPipeline, PipelineDeps, RateLimiter};
use shopdesk_config::ShopdeskConfig;
use shopdesk_core::{KeyValueStore, LlmProvider, PluginAdapter, ShopdeskError, ToolLayer};
use shopdesk_openrouter::OpenRouterProvider;
use shopdesk_resilience::CircuitBreakerConfig;
use shopdesk_storage::SqliteStorage;
use shopdesk_tools::SqliteTools;
use tracing::{info, warn};

/// Backends the quota and analytics commands need; no LLM involved.
pub struct StoreServices {
    pub store: Arc<dyn KeyValueStore>,
}

impl StoreServices {
    pub fn open(config: &ShopdeskConfig) -> Result<Self, ShopdeskError> {
        let store = shopdesk_store::open_store(&config.store)?;
        info!(backend = store.name(), "counter store ready");
        Ok(Self { store })
    }

    pub fn rate_limiter(&self, config: &ShopdeskConfig) -> RateLimiter {
        RateLimiter::new(
            self.store.clone(),
            &config.rate_limit,
            CircuitBreakerConfig {
                failure_threshold: config.circuit_breaker.rate_limiter_failure_threshold,
                recovery_timeout: Duration::from_secs(
                    config.circuit_breaker.rate_limiter_recovery_secs,
                ),
            },
        )
    }

    pub fn analytics(&self, config: &ShopdeskConfig) -> AnalyticsTracker {
        AnalyticsTracker::new(self.store.clone(), &config.analytics)
    }
}

/// Every backend the pipeline runs on.
pub struct Services {
    pub pipeline: ChatPipeline,
    pub store: Arc<dyn KeyValueStore>,
    pub provider: Arc<dyn LlmProvider>,
    pub tools: Arc<dyn ToolLayer>,
    pub storage: SqliteStorage,
}

impl Services {
    /// Opens the store, the database (running migrations) and the LLM provider.
    pub async fn open(config: &ShopdeskConfig) -> Result<Self, ShopdeskError> {
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenRouterProvider::new(&config.llm)?);
        Self::open_with_provider(config, provider).await
    }

    /// Like [`Services::open`] with an already-built provider.
    pub async fn open_with_provider(
        config: &ShopdeskConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, ShopdeskError> {
        let StoreServices { store } = StoreServices::open(config)?;
        let storage = SqliteStorage::open(&config.storage).await?;
        info!(path = %config.storage.database_path, "database ready");
        let tools: Arc<dyn ToolLayer> = Arc::new(SqliteTools::new(storage.database().clone()));

        let pipeline = ChatPipeline::new(
            config,
            PipelineDeps {
                store: store.clone(),
                provider: provider.clone(),
                tools: tools.clone(),
                messages: Arc::new(storage.clone()),
            },
        )?;

        Ok(Self {
            pipeline,
            store,
            provider,
            tools,
            storage,
        })
    }

    /// Waits up to `drain` for background work, then closes every backend.
    pub async fn shutdown(&self, drain: Duration) {
        if tokio::time::timeout(drain, self.pipeline.wait_for_background_tasks())
            .await
            .is_err()
        {
            warn!(drain_secs = drain.as_secs(), "background tasks still running at shutdown");
        }

        let results = [
            ("store", self.store.shutdown().await),
            ("provider", self.provider.shutdown().await),
            ("tools", self.tools.shutdown().await),
            ("storage", self.storage.shutdown().await),
        ];
        for (role, result) in results {
            if let Err(e) = result {
                warn!(role, error = %e, "adapter shutdown failed");
            }
        }
        info!("backends closed");
    }
}
