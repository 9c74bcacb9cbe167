// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`MessageStore`].

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use shopdesk_config::model::StorageConfig;
use shopdesk_core::{
    AdapterType, HealthStatus, MessageStore, PluginAdapter, ShopdeskError, StoredMessage,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store.
///
/// Delegates to the typed query modules. The same [`Database`] handle can be
/// shared with the tool layer.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the configured database, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, ShopdeskError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopdeskError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ShopdeskError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteStorage {
    async fn ensure_session(&self, session_id: &str, user_id: &str) -> Result<(), ShopdeskError> {
        let now = Utc::now().to_rfc3339();
        queries::sessions::ensure_session(&self.db, session_id, user_id, &now).await
    }

    async fn append_message(&self, message: &StoredMessage) -> Result<(), ShopdeskError> {
        queries::messages::insert_message(&self.db, message).await
    }

    async fn messages_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<StoredMessage>, ShopdeskError> {
        queries::messages::list_messages(&self.db, session_id).await
    }
}
