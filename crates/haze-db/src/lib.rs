//! # haze-db: Database Layer for Haze Ledger
//!
//! This crate provides database access for Haze Ledger.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Haze Ledger Data Flow                            │
//! │                                                                         │
//! │  axum handler (POST /api/sales)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     haze-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_initial  │  │   │
//! │  │   │ Connection    │    │ ExpenseRepo   │    │   _schema    │  │   │
//! │  │   │ Management    │    │ PayableRepo…  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                     ./haze.db (configurable)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, sale, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use haze_db::{Database, DbConfig};
//!
//! // Migrations run on connect by default
//! let db = Database::new(DbConfig::new("haze.db")).await?;
//!
//! let low = db
//!     .products()
//!     .list(&ProductFilter { low_stock: true, ..Default::default() })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::capital::CapitalRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::log::ActivityLogRepository;
pub use repository::payable::PayableRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockRepository;
pub use repository::user::UserRepository;
