//! # Schema Migrations
//!
//! The ledger schema ships inside the binary; `Database::new` brings any
//! database file up to date before the first repository call.
//!
//! ```text
//!   migrations/sqlite/
//!     001_initial_schema.sql   products, acquisition_batches, sales, sale_items,
//!                              expenses, payables, payable_settlements,
//!                              capital_entries, activity_logs, users
//!     002_sale_payments.sql    receivable payments, dated when received
//! ```
//!
//! Applied versions are tracked by sqlx in `_sqlx_migrations`. A shipped
//! file is never edited; schema changes go in a new `NNN_description.sql`.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// How far a database is behind the embedded schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

/// Applies pending migrations. Safe on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = migration_status(pool).await?;
    if before.is_current() {
        debug!(applied = before.applied, "Schema up to date");
        return Ok(());
    }

    for migration in MIGRATOR.iter().skip(before.applied) {
        debug!(version = migration.version, description = %migration.description, "Pending migration");
    }

    MIGRATOR.run(pool).await?;

    info!(
        from = before.applied,
        to = before.embedded,
        "Ledger schema migrated"
    );
    Ok(())
}

/// Compares embedded migrations with the ones recorded in the database.
///
/// A fresh database without the tracking table counts as zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if tracked == 0 {
        0
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    };

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: applied as usize,
    })
}
