//! # haze-core: Pure Business Logic for Haze Ledger
//!
//! This crate holds the domain model and rules of the shop: what a product,
//! sale, expense or payable is, how sellable stock is derived, and how a
//! payment is split between cash, digital and due.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Haze Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    haze-api (axum REST)                         │   │
//! │  │    /api/products ── /api/sales ── /api/expenses ── /api/...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ haze-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   stock   │  │  payment  │  │ validation│  │   │
//! │  │   │  Product  │  │ StockLevel│  │  Split    │  │   rules   │  │   │
//! │  │   │   Sale    │  │  derive   │  │ Settlement│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    haze-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Sale, Expense, Payable, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`stock`] - Derived stock: acquired − sold − damaged − tester
//! - [`payment`] - Cash / digital / due split and settlements
//! - [`accounting`] - Profit and balance summary arithmetic
//! - [`input`] - Write models and query filters for every mutation
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use haze_core::payment::PaymentSplit;
//! use haze_core::stock::StockLevel;
//! use haze_core::Money;
//!
//! let stock = StockLevel::new(50, 12, 1, 2);
//! assert_eq!(stock.available(), 35);
//!
//! let split = PaymentSplit::new(1500, 500, 0);
//! assert!(split.reconcile(Money::from_cents(2000)).is_ok());
//! ```

pub mod accounting;
pub mod error;
pub mod input;
pub mod money;
pub mod payment;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use accounting::{FinancialSummary, Flow, LedgerTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use payment::{PaymentSplit, PaymentStatus, Settlement};
pub use stock::StockLevel;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of line items on a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity for a single line item, restock batch or write-off.
///
/// Guards against typing 10000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 10_000;

/// Largest single price, amount or split part accepted, in cents.
///
/// One billion in major units. Keeps `price × MAX_ITEM_QUANTITY` summed over
/// `MAX_SALE_ITEMS` lines well inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Stock level at or below which a product is reported as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Allowed difference between a payment split and its total, in cents.
///
/// Money is integer cents end to end, so the split must match exactly.
pub const SPLIT_TOLERANCE_CENTS: i64 = 0;
