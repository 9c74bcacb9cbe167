// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary. Refinery
//! records applied versions in `refinery_schema_history`.

use shopdesk_core::ShopdeskError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies every pending migration to `conn`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), ShopdeskError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| ShopdeskError::Storage {
            source: Box::new(e),
        })?;
    for migration in report.applied_migrations() {
        tracing::info!(migration = %migration, "applied migration");
    }
    Ok(())
}
