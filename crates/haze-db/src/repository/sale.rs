//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewSale { items, payment }                                            │
//! │       │                                                                 │
//! │       ▼  validate() (no I/O: item count, quantities, phone)            │
//! │  BEGIN                                                                 │
//! │   ├── for each product in the sale:                                    │
//! │   │     SELECT product            → 404-style ProductNotFound          │
//! │   │     stock::level_in()         → InsufficientStock if short         │
//! │   ├── total = Σ qty × unit price (snapshot)                            │
//! │   ├── payment.reconcile(total)    → SplitMismatch                      │
//! │   ├── INSERT sales, sale_items                                         │
//! │   └── INSERT activity_logs                                             │
//! │  COMMIT   (any failure above rolls everything back)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status is never stored: paid / partial / due is derived from `due_cents`
//! (see [`haze_core::PaymentSplit::status`]). The list filter mirrors that
//! rule in SQL.

use std::collections::HashMap;

use chrono::Utc;
use haze_core::input::{NewSale, SaleFilter, SaleFlag};
use haze_core::validation::amount_out_of_range;
use haze_core::{CoreError, Money, Sale, SaleDetail, SaleItem, SalePayment, Settlement};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::stock::level_in;
use crate::repository::{clean, generate_id, log, product, today};

const SALE_COLUMNS: &str = r#"
    id, date, customer_name, customer_phone, total_cents,
    cash_cents, digital_cents, due_cents, flagged, flag_comment,
    created_by, created_at, updated_at
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists sales newest first.
    ///
    /// ## Filters
    /// - `from` / `to`: inclusive business dates
    /// - `status`: derived paid / partial / due
    /// - `flagged`: review flag
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        debug!(from = ?filter.from, to = ?filter.to, status = ?filter.status, "Listing sales");

        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE (?1 IS NULL OR date >= ?1)
              AND (?2 IS NULL OR date <= ?2)
              AND (?3 IS NULL
                   OR (?3 = 'paid' AND due_cents = 0)
                   OR (?3 = 'due' AND due_cents > 0 AND due_cents >= total_cents)
                   OR (?3 = 'partial' AND due_cents > 0 AND due_cents < total_cents))
              AND (?4 IS NULL OR flagged = ?4)
            ORDER BY date DESC, created_at DESC
            "#
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.flagged)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Sales with money still owed by the customer, oldest first.
    pub async fn receivables(&self) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE due_cents > 0 ORDER BY date ASC, created_at ASC"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    /// Gets a sale by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut conn, id).await
    }

    /// Gets a sale with its line items.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        let payments = self.payments(id).await?;
        Ok(Some(SaleDetail::new(sale, items, payments)))
    }

    /// Payments received against a sale after it was made, oldest first.
    pub async fn payments(&self, sale_id: &str) -> DbResult<Vec<SalePayment>> {
        let payments = sqlx::query_as::<_, SalePayment>(
            r#"
            SELECT id, sale_id, cash_cents, digital_cents, created_by, created_at
            FROM sale_payments
            WHERE sale_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Line items of a sale, in entry order.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, product_name, quantity,
                   unit_price_cents, line_total_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Records a sale.
    ///
    /// ## Rules
    /// - Every product exists and has enough derived stock for the total
    ///   quantity requested across all lines
    /// - The payment split reconciles with Σ quantity × unit price
    pub async fn create(&self, new: &NewSale, actor: &str) -> DbResult<SaleDetail> {
        new.validate()?;

        debug!(items = new.items.len(), "Creating sale");

        let mut tx = self.pool.begin().await?;

        // Requested quantity per product, so a product listed on two lines
        // is checked against its stock once for the combined amount.
        let mut requested: HashMap<&str, i64> = HashMap::new();
        for line in &new.items {
            *requested.entry(line.product_id.as_str()).or_default() += line.quantity;
        }

        let mut products = HashMap::new();
        for (&product_id, &qty) in &requested {
            let found = product::fetch_in(&mut tx, product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
            let level = level_in(&mut tx, product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
            level.ensure_available(&found.name, qty)?;
            products.insert(product_id, found);
        }

        let now = Utc::now();
        let sale_id = generate_id();

        let mut items = Vec::with_capacity(new.items.len());
        for line in &new.items {
            let product = products
                .get(line.product_id.as_str())
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            let unit_price = line.unit_price_cents.unwrap_or(product.selling_price_cents);
            let line_total = Money::from_cents(unit_price)
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(|| amount_out_of_range("line total"))?;
            items.push(SaleItem {
                id: generate_id(),
                sale_id: sale_id.clone(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price_cents: unit_price,
                line_total_cents: line_total.cents(),
            });
        }

        let total = Money::checked_sum(items.iter().map(SaleItem::line_total))
            .ok_or_else(|| amount_out_of_range("sale total"))?;
        new.payment.reconcile(total)?;

        let sale = Sale {
            id: sale_id,
            date: new.date.unwrap_or_else(today),
            customer_name: clean(new.customer_name.as_deref()),
            customer_phone: clean(new.customer_phone.as_deref()),
            total_cents: total.cents(),
            cash_cents: new.payment.cash_cents,
            digital_cents: new.payment.digital_cents,
            due_cents: new.payment.due_cents,
            flagged: false,
            flag_comment: None,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, date, customer_name, customer_phone, total_cents,
                cash_cents, digital_cents, due_cents, flagged, flag_comment,
                created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&sale.id)
        .bind(sale.date)
        .bind(&sale.customer_name)
        .bind(&sale.customer_phone)
        .bind(sale.total_cents)
        .bind(sale.cash_cents)
        .bind(sale.digital_cents)
        .bind(sale.due_cents)
        .bind(sale.flagged)
        .bind(&sale.flag_comment)
        .bind(&sale.created_by)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, product_name, quantity,
                    unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;
        }

        let units: i64 = items.iter().map(|i| i.quantity).sum();
        log::append_in(
            &mut tx,
            actor,
            format!(
                "Recorded sale of {units} unit(s) totalling {}{} ({})",
                sale.total(),
                sale.customer_name
                    .as_deref()
                    .map(|c| format!(" to {c}"))
                    .unwrap_or_default(),
                sale.status().as_str(),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            id = %sale.id,
            total = sale.total_cents,
            due = sale.due_cents,
            "Sale recorded"
        );
        Ok(SaleDetail::new(sale, items, Vec::new()))
    }

    /// Records a customer payment against a sale's due amount.
    ///
    /// The settled amount moves from `due` into `cash` / `digital`, so the
    /// split keeps summing to the total. The payment itself is kept in
    /// `sale_payments`, dated today, for reports and history.
    pub async fn record_payment(
        &self,
        id: &str,
        settlement: &Settlement,
        actor: &str,
    ) -> DbResult<Sale> {
        debug!(id = %id, amount = settlement.total().cents(), "Recording sale payment");

        let mut tx = self.pool.begin().await?;

        let sale = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        let current = sale.payment();
        if current.due_cents <= 0 {
            return Err(CoreError::NothingOutstanding(format!("sale {id}")).into());
        }

        let paid = settlement.validate_against(current.due())?;
        let next = current.apply(settlement);
        next.reconcile(sale.total())?;

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO sale_payments (
                id, sale_id, cash_cents, digital_cents, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(generate_id())
        .bind(id)
        .bind(settlement.cash_cents)
        .bind(settlement.digital_cents)
        .bind(actor)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE sales
            SET cash_cents = ?2, digital_cents = ?3, due_cents = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(next.cash_cents)
        .bind(next.digital_cents)
        .bind(next.due_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let updated = Sale {
            cash_cents: next.cash_cents,
            digital_cents: next.digital_cents,
            due_cents: next.due_cents,
            updated_at: now,
            ..sale
        };

        log::append_in(
            &mut tx,
            actor,
            format!(
                "Received {} from {} against sale {}; {} still due",
                paid,
                updated.customer_name.as_deref().unwrap_or("customer"),
                short_id(id),
                updated.payment().due(),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, paid = paid.cents(), due = updated.due_cents, "Sale payment recorded");
        Ok(updated)
    }

    /// Flags or unflags a sale for review.
    pub async fn set_flag(&self, id: &str, flag: &SaleFlag, actor: &str) -> DbResult<Sale> {
        flag.validate()?;

        let mut tx = self.pool.begin().await?;

        let sale = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        let comment = if flag.flagged {
            clean(flag.comment.as_deref())
        } else {
            None
        };
        let now = Utc::now();

        sqlx::query("UPDATE sales SET flagged = ?2, flag_comment = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(id)
            .bind(flag.flagged)
            .bind(&comment)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let action = match (&comment, flag.flagged) {
            (Some(c), true) => format!("Flagged sale {} for review: {c}", short_id(id)),
            (None, true) => format!("Flagged sale {} for review", short_id(id)),
            (_, false) => format!("Cleared review flag on sale {}", short_id(id)),
        };
        log::append_in(&mut tx, actor, action).await?;

        tx.commit().await?;

        info!(id = %id, flagged = flag.flagged, "Sale flag updated");
        Ok(Sale {
            flagged: flag.flagged,
            flag_comment: comment,
            updated_at: now,
            ..sale
        })
    }

    /// Deletes a sale. Its units return to stock since stock is derived.
    pub async fn delete(&self, id: &str, actor: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting sale");

        let mut tx = self.pool.begin().await?;

        let sale = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;

        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        log::append_in(
            &mut tx,
            actor,
            format!(
                "Deleted sale {} of {} dated {}",
                short_id(id),
                sale.total(),
                sale.date
            ),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, "Sale deleted");
        Ok(())
    }
}

async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(sale)
}

/// First block of a UUID, for log lines.
fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}
