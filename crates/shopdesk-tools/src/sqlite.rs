// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ToolLayer`] backed by the SQLite catalog.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shopdesk_core::{
    AdapterType, HealthStatus, PluginAdapter, ShopdeskError, ToolLayer, ToolName,
};
use shopdesk_storage::Database;
use tracing::debug;

use crate::args;
use crate::handlers;

/// Runs the catalog tools against a shared [`Database`].
#[derive(Debug, Clone)]
pub struct SqliteTools {
    db: Database,
}

impl SqliteTools {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteTools {
    fn name(&self) -> &str {
        "catalog-tools"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Tools
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopdeskError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ShopdeskError> {
        Ok(())
    }
}

#[async_trait]
impl ToolLayer for SqliteTools {
    async fn call(&self, tool: ToolName, args: Value) -> Result<Value, ShopdeskError> {
        debug!(tool = %tool, "running catalog tool");
        let now = Utc::now();
        match tool {
            ToolName::SalesAnalytics => {
                handlers::sales::run(&self.db, args::parse(tool, args)?, now).await
            }
            ToolName::InventoryStatus => {
                handlers::inventory::run(&self.db, args::parse(tool, args)?).await
            }
            ToolName::CustomerInsights => {
                handlers::customers::run(&self.db, args::parse(tool, args)?, now).await
            }
            ToolName::OrderManagement => {
                handlers::orders::run(&self.db, args::parse(tool, args)?).await
            }
        }
    }
}
