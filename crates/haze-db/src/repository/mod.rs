//! # Repository Module
//!
//! Database repository implementations for Haze Ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  db.sales().create(&new_sale, "Rafi")                          │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ┌───────────────────── one transaction ─────────────────────────┐    │
//! │  │  stock::level_in()      derive stock, reject if short          │    │
//! │  │  INSERT sales / sale_items                                     │    │
//! │  │  log::append_in()       activity trail entry                   │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating method takes the acting user's name and writes its
//! activity log entry inside the same transaction as the change itself.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalogue, restocks, write-offs
//! - [`stock::StockRepository`] - Derived stock levels
//! - [`sale::SaleRepository`] - Sales, items, receivable payments, flags
//! - [`expense::ExpenseRepository`] - Manual and system expenses
//! - [`payable::PayableRepository`] - Supplier dues and settlements
//! - [`capital::CapitalRepository`] - Owner investments / withdrawals
//! - [`log::ActivityLogRepository`] - Append-only activity trail
//! - [`user::UserRepository`] - Logins and roles
//! - [`report::ReportRepository`] - Financial summary, receivables

pub mod capital;
pub mod expense;
pub mod log;
pub mod payable;
pub mod product;
pub mod report;
pub mod sale;
pub mod stock;
pub mod user;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

/// Generates a new entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Business date used when a payload omits one.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Trims optional free text, mapping blank to `None`.
pub(crate) fn clean(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// `LIKE` pattern matching `search` anywhere, with `%`, `_` and `\` taken
/// literally. Pair with `ESCAPE '\'`.
pub(crate) fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for repository tests.

    use haze_core::input::{NewBatch, NewProduct};
    use haze_core::{PaymentSplit, ProductWithStock};

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn new_product(name: &str, cost: i64, selling: i64, initial: Option<i64>) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: "E-Liquid".to_string(),
            cost_price_cents: cost,
            selling_price_cents: selling,
            low_stock_threshold: None,
            initial_stock: initial.map(|quantity| NewBatch {
                date: None,
                quantity,
                cost_price_cents: None,
                supplier: Some("Vapor Wholesale".to_string()),
                payment: None,
                note: None,
            }),
        }
    }

    /// Creates a product with `stock` units bought in cash.
    pub async fn stocked_product(db: &Database, name: &str, stock: i64) -> ProductWithStock {
        db.products()
            .create(&new_product(name, 800, 1400, Some(stock)), "admin")
            .await
            .unwrap()
    }

    pub fn cash(cents: i64) -> PaymentSplit {
        PaymentSplit::new(cents, 0, 0)
    }
}
