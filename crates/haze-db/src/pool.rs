//! # Ledger Database Handle
//!
//! Opens the shop's SQLite file and hands out repositories.
//!
//! ```text
//!   DbConfig::new("haze.db")            DbConfig::in_memory()
//!          │  WAL, 5 connections               │  1 connection, no WAL
//!          └──────────────┬────────────────────┘
//!                         ▼
//!              Database::new(config)
//!                ├── PRAGMA foreign_keys = ON
//!                ├── PRAGMA busy_timeout
//!                └── migrations::run_migrations
//!                         │
//!                         ▼
//!   db.products()  db.sales()  db.expenses()  db.payables()  db.reports() ...
//!   (each repository holds a clone of the pool)
//! ```
//!
//! Readers never block the till under WAL; concurrent writers queue on
//! SQLite's lock for up to `busy_timeout` before failing.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::capital::CapitalRepository;
use crate::repository::expense::ExpenseRepository;
use crate::repository::log::ActivityLogRepository;
use crate::repository::payable::PayableRepository;
use crate::repository::product::ProductRepository;
use crate::repository::report::ReportRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockRepository;
use crate::repository::user::UserRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the ledger lives and how many connections may touch it.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/haze/haze.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long a request waits for a free pool connection.
    pub acquire_timeout: Duration,

    /// How long a writer waits on SQLite's lock before `database is locked`.
    pub busy_timeout: Duration,
}

impl DbConfig {
    /// A file-backed ledger. The file is created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// A private, empty ledger for tests.
    ///
    /// An in-memory SQLite database belongs to a single connection, so the
    /// pool is pinned to one that never idles out.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(1),
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}", self.database_path.display())
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .synchronous(SqliteSynchronous::Normal);

        Ok(if self.is_in_memory() {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        })
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the ledger. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the ledger and migrates it to the current schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening ledger database");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);

        if config.is_in_memory() {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        info!(max_connections = config.max_connections, "Ledger database ready");
        Ok(Database { pool })
    }

    /// Raw pool access, for diagnostics.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Product catalogue, restocks and write-offs.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Derived stock levels.
    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    /// Sales, line items and receivable settlements.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.pool.clone())
    }

    pub fn payables(&self) -> PayableRepository {
        PayableRepository::new(self.pool.clone())
    }

    pub fn capital(&self) -> CapitalRepository {
        CapitalRepository::new(self.pool.clone())
    }

    /// Append-only activity trail.
    pub fn logs(&self) -> ActivityLogRepository {
        ActivityLogRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Financial summary and inventory valuation.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        info!("Closing ledger database");
        self.pool.close().await;
    }

    /// True when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_ledger_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let status = migrations::migration_status(db.pool()).await.unwrap();
        assert!(status.is_current());
        assert!(status.embedded >= 2);

        // Running again is a no-op
        migrations::run_migrations(db.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_ledgers_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        a.logs().append("tester", "only in a").await.unwrap();

        assert_eq!(a.logs().count().await.unwrap(), 1);
        assert_eq!(b.logs().count().await.unwrap(), 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/haze.db")
            .max_connections(0)
            .busy_timeout(Duration::from_secs(10));

        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_secs(10));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
