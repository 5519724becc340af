//! # Report Repository
//!
//! Aggregates the ledger into a [`FinancialSummary`].
//!
//! ## Window Semantics
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │ Figure                   │ Filtered by the optional [from, to] window?  │
//! ├──────────────────────────┼──────────────────────────────────────────────┤
//! │ revenue, COGS            │ yes, by sale date                            │
//! │ expenses, write-offs     │ yes, by expense date                         │
//! │ cash / digital flows     │ yes: sale, batch, expense, capital dates;    │
//! │                          │ payable and sale payment timestamps          │
//! │ receivables, payables    │ no, always what is outstanding now           │
//! │ inventory value          │ no, always current stock × current cost      │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Every aggregate is one SQL statement; [`FinancialSummary::from_totals`]
//! does the arithmetic.

use haze_core::input::DateRange;
use haze_core::{FinancialSummary, Flow, LedgerTotals, Money};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::stock::{ProductStockRow, PRODUCT_STOCK_SELECT};

#[derive(Debug, FromRow)]
struct FlowRow {
    cash: i64,
    digital: i64,
}

impl From<FlowRow> for Flow {
    fn from(row: FlowRow) -> Self {
        Flow::new(row.cash, row.digital)
    }
}

/// Repository for financial reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the financial summary for an optional date window.
    pub async fn summary(&self, range: &DateRange) -> DbResult<FinancialSummary> {
        range.validate()?;
        let totals = self.totals(range).await?;
        debug!(from = ?range.from, to = ?range.to, revenue = totals.revenue.cents(), "Summary computed");
        Ok(FinancialSummary::from_totals(&totals))
    }

    /// Raw aggregates behind [`Self::summary`].
    pub async fn totals(&self, range: &DateRange) -> DbResult<LedgerTotals> {
        let revenue = self
            .scalar(
                r#"
                SELECT COALESCE(SUM(total_cents), 0) FROM sales
                WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
                "#,
                range,
            )
            .await?;

        let cost_of_goods_sold = self
            .scalar(
                r#"
                SELECT COALESCE(SUM(i.quantity * p.cost_price_cents), 0)
                FROM sale_items i
                JOIN sales s ON s.id = i.sale_id
                JOIN products p ON p.id = i.product_id
                WHERE (?1 IS NULL OR s.date >= ?1) AND (?2 IS NULL OR s.date <= ?2)
                "#,
                range,
            )
            .await?;

        let expenses = self
            .scalar(
                r#"
                SELECT COALESCE(SUM(amount_cents), 0) FROM expenses
                WHERE system_generated = 0
                  AND (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
                "#,
                range,
            )
            .await?;

        let write_offs = self
            .scalar(
                r#"
                SELECT COALESCE(SUM(amount_cents), 0) FROM expenses
                WHERE system_generated = 1
                  AND (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
                "#,
                range,
            )
            .await?;

        let receivables = self
            .scalar(
                "SELECT COALESCE(SUM(due_cents), 0) FROM sales",
                &DateRange::default(),
            )
            .await?;

        let payables = self
            .scalar(
                "SELECT COALESCE(SUM(amount_cents - paid_cents), 0) FROM payables",
                &DateRange::default(),
            )
            .await?;

        let capital = self
            .flow(
                r#"
                SELECT
                    COALESCE(SUM(CASE kind WHEN 'investment' THEN cash_cents ELSE -cash_cents END), 0) AS cash,
                    COALESCE(SUM(CASE kind WHEN 'investment' THEN digital_cents ELSE -digital_cents END), 0) AS digital
                FROM capital_entries
                WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
                "#,
                range,
            )
            .await?;

        // The sale row holds everything received so far; later payments are
        // taken back out here and counted on their own date below.
        let sales = self
            .flow(
                r#"
                SELECT
                    COALESCE(SUM(s.cash_cents - COALESCE(p.cash, 0)), 0) AS cash,
                    COALESCE(SUM(s.digital_cents - COALESCE(p.digital, 0)), 0) AS digital
                FROM sales s
                LEFT JOIN (
                    SELECT sale_id, SUM(cash_cents) AS cash, SUM(digital_cents) AS digital
                    FROM sale_payments
                    GROUP BY sale_id
                ) p ON p.sale_id = s.id
                WHERE (?1 IS NULL OR s.date >= ?1) AND (?2 IS NULL OR s.date <= ?2)
                "#,
                range,
            )
            .await?;

        let receivable_payments = self
            .flow(
                r#"
                SELECT COALESCE(SUM(cash_cents), 0) AS cash, COALESCE(SUM(digital_cents), 0) AS digital
                FROM sale_payments
                WHERE (?1 IS NULL OR substr(created_at, 1, 10) >= ?1)
                  AND (?2 IS NULL OR substr(created_at, 1, 10) <= ?2)
                "#,
                range,
            )
            .await?;

        let restock = self
            .flow(
                r#"
                SELECT COALESCE(SUM(cash_cents), 0) AS cash, COALESCE(SUM(digital_cents), 0) AS digital
                FROM acquisition_batches
                WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
                "#,
                range,
            )
            .await?;

        let expense_payments = self
            .flow(
                r#"
                SELECT COALESCE(SUM(cash_cents), 0) AS cash, COALESCE(SUM(digital_cents), 0) AS digital
                FROM expenses
                WHERE system_generated = 0
                  AND (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
                "#,
                range,
            )
            .await?;

        let payable_settlements = self
            .flow(
                r#"
                SELECT COALESCE(SUM(cash_cents), 0) AS cash, COALESCE(SUM(digital_cents), 0) AS digital
                FROM payable_settlements
                WHERE (?1 IS NULL OR substr(created_at, 1, 10) >= ?1)
                  AND (?2 IS NULL OR substr(created_at, 1, 10) <= ?2)
                "#,
                range,
            )
            .await?;

        Ok(LedgerTotals {
            revenue,
            cost_of_goods_sold,
            expenses,
            write_offs,
            receivables,
            payables,
            capital,
            sales,
            receivable_payments,
            restock,
            expense_payments,
            payable_settlements,
            inventory_value: self.inventory_value().await?,
        })
    }

    /// Σ available stock × current cost price over all products.
    pub async fn inventory_value(&self) -> DbResult<Money> {
        let rows = sqlx::query_as::<_, ProductStockRow>(PRODUCT_STOCK_SELECT)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                row.product
                    .cost_price()
                    .multiply_quantity(row.level().available())
            })
            .sum())
    }

    async fn scalar(&self, sql: &str, range: &DateRange) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(sql)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(&self.pool)
            .await?;
        Ok(Money::from_cents(cents))
    }

    async fn flow(&self, sql: &str, range: &DateRange) -> DbResult<Flow> {
        let row = sqlx::query_as::<_, FlowRow>(sql)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }
}
