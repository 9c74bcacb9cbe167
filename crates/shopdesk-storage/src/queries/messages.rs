// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat message queries.

use rusqlite::params;
use shopdesk_core::{ShopdeskError, StoredMessage};

use crate::database::{Database, map_tr_err};

pub async fn insert_message(db: &Database, message: &StoredMessage) -> Result<(), ShopdeskError> {
    let msg = message.clone();
    let metadata = serde_json::to_string(&msg.metadata).map_err(|e| ShopdeskError::Storage {
        source: Box::new(e),
    })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_messages
                 (id, session_id, query, response, intent, execution_time, confidence, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    msg.id,
                    msg.session_id,
                    msg.query,
                    msg.response,
                    msg.intent,
                    msg.execution_time,
                    msg.confidence,
                    metadata,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a session in insertion order.
pub async fn list_messages(
    db: &Database,
    session_id: &str,
) -> Result<Vec<StoredMessage>, ShopdeskError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, query, response, intent, execution_time, confidence,
                        metadata, created_at
                 FROM chat_messages WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )?;
            let messages = stmt
                .query_map(params![session_id], |row| {
                    let metadata: String = row.get(7)?;
                    Ok(StoredMessage {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        query: row.get(2)?,
                        response: row.get(3)?,
                        intent: row.get(4)?,
                        execution_time: row.get(5)?,
                        confidence: row.get(6)?,
                        metadata: serde_json::from_str(&metadata)
                            .unwrap_or(serde_json::Value::Null),
                        created_at: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_messages(db: &Database, session_id: &str) -> Result<i64, ShopdeskError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
