// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! serializes writes. Migrations run once on a short-lived blocking
//! connection before that handle is opened.

use std::path::{Path, PathBuf};

use shopdesk_core::ShopdeskError;
use tracing::{debug, info};

use crate::migrations;

/// Shared handle to the SQLite database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

/// Converts a tokio-rusqlite call error into a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ShopdeskError {
    ShopdeskError::Storage {
        source: e.to_string().into(),
    }
}

pub(crate) fn map_sql_err(e: rusqlite::Error) -> ShopdeskError {
    ShopdeskError::Storage {
        source: Box::new(e),
    }
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies pending migrations.
    pub async fn open(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, ShopdeskError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ShopdeskError::Storage {
                    source: Box::new(e),
                })?;
        }

        let setup_path = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), ShopdeskError> {
            let mut conn = rusqlite::Connection::open(&setup_path).map_err(map_sql_err)?;
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })
                .map_err(map_sql_err)?;
            }
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| ShopdeskError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| ShopdeskError::Storage {
                source: e.to_string().into(),
            })?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))
        })
        .await
        .map_err(map_tr_err)?;

        info!(path = %path.display(), "database opened");
        Ok(Self { conn, path })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs a trivial statement to confirm the database answers.
    pub async fn ping(&self) -> Result<(), ShopdeskError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoints the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), ShopdeskError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
