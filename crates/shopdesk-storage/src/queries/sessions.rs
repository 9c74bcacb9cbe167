// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session queries.

use rusqlite::{OptionalExtension, params};
use shopdesk_core::ShopdeskError;

use crate::database::{Database, map_tr_err};

/// A conversation thread owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Creates the session if missing and bumps `updated_at` either way.
///
/// An existing session keeps its original owner.
pub async fn ensure_session(
    db: &Database,
    session_id: &str,
    user_id: &str,
    now: &str,
) -> Result<(), ShopdeskError> {
    let (session_id, user_id, now) = (session_id.to_string(), user_id.to_string(), now.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_sessions (session_id, user_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(session_id) DO UPDATE SET updated_at = excluded.updated_at",
                params![session_id, user_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_session(db: &Database, session_id: &str) -> Result<Option<Session>, ShopdeskError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT session_id, user_id, created_at, updated_at
                 FROM chat_sessions WHERE session_id = ?1",
                params![session_id],
                |row| {
                    Ok(Session {
                        session_id: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Sessions of a user, most recently active first.
pub async fn list_sessions_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<Session>, ShopdeskError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, user_id, created_at, updated_at
                 FROM chat_sessions WHERE user_id = ?1 ORDER BY updated_at DESC",
            )?;
            let sessions = stmt
                .query_map(params![user_id], |row| {
                    Ok(Session {
                        session_id: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
        .await
        .map_err(map_tr_err)
}
