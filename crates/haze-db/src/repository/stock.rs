//! # Stock Repository
//!
//! SQL side of stock derivation: sums batch and sold quantities and hands
//! them to [`StockLevel`], which owns the subtraction.
//!
//! ```text
//!   acquisition_batches ──SUM(quantity)──┐
//!   sale_items          ──SUM(quantity)──┼──► StockLevel::available()
//!   products.damaged / products.tester ──┘
//! ```
//!
//! [`level_in`] runs on a caller's transaction so that a stock check and the
//! write that consumes stock see the same snapshot.

use std::collections::HashMap;

use haze_core::{Product, StockLevel};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::error::DbResult;

/// Aggregated stock inputs for one product.
#[derive(Debug, FromRow)]
pub(crate) struct StockRow {
    pub product_id: String,
    pub acquired: i64,
    pub sold: i64,
    pub damaged: i64,
    pub tester: i64,
}

impl From<&StockRow> for StockLevel {
    fn from(row: &StockRow) -> Self {
        StockLevel::new(row.acquired, row.sold, row.damaged, row.tester)
    }
}

/// A product row joined with its stock aggregates.
#[derive(Debug, FromRow)]
pub(crate) struct ProductStockRow {
    #[sqlx(flatten)]
    pub product: Product,
    pub acquired: i64,
    pub sold: i64,
}

impl ProductStockRow {
    pub fn level(&self) -> StockLevel {
        StockLevel::new(
            self.acquired,
            self.sold,
            self.product.damaged_quantity,
            self.product.tester_quantity,
        )
    }
}

/// Product columns plus `acquired` / `sold` aggregates. Callers append a
/// WHERE clause on `p`.
pub(crate) const PRODUCT_STOCK_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.category, p.cost_price_cents, p.selling_price_cents,
        p.damaged_quantity, p.tester_quantity, p.low_stock_threshold,
        p.created_at, p.updated_at,
        COALESCE((SELECT SUM(b.quantity) FROM acquisition_batches b WHERE b.product_id = p.id), 0) AS acquired,
        COALESCE((SELECT SUM(i.quantity) FROM sale_items i WHERE i.product_id = p.id), 0) AS sold
    FROM products p
"#;

const STOCK_SELECT: &str = r#"
    SELECT
        p.id AS product_id,
        COALESCE((SELECT SUM(b.quantity) FROM acquisition_batches b WHERE b.product_id = p.id), 0) AS acquired,
        COALESCE((SELECT SUM(i.quantity) FROM sale_items i WHERE i.product_id = p.id), 0) AS sold,
        p.damaged_quantity AS damaged,
        p.tester_quantity AS tester
    FROM products p
"#;

/// Repository for derived stock levels.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Stock level of one product, `None` if it doesn't exist.
    pub async fn level(&self, product_id: &str) -> DbResult<Option<StockLevel>> {
        let mut conn = self.pool.acquire().await?;
        level_in(&mut conn, product_id).await
    }

    /// Stock levels of every product, keyed by product ID.
    pub async fn all_levels(&self) -> DbResult<HashMap<String, StockLevel>> {
        let rows = sqlx::query_as::<_, StockRow>(STOCK_SELECT)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.product_id.clone(), StockLevel::from(row)))
            .collect())
    }
}

/// Stock level of one product on an existing connection or transaction.
pub(crate) async fn level_in(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Option<StockLevel>> {
    let sql = format!("{STOCK_SELECT} WHERE p.id = ?1");
    let row = sqlx::query_as::<_, StockRow>(&sql)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.as_ref().map(StockLevel::from))
}
