//! # Payable Repository
//!
//! Money the shop owes. A payable is opened for the due part of a restock
//! or an expense and closed by one or more settlements.
//!
//! ```text
//!   restock / expense with due ──open_in()──► payables (amount, paid = 0)
//!                                                 │
//!   POST /api/accounts/payables/{id}/settle ──────┤  settle()
//!                                                 ▼
//!                        payable_settlements (cash, digital)  +  paid += n
//! ```

use chrono::Utc;
use haze_core::{Money, Payable, PayableSettlement, PayableSource, Settlement};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{generate_id, log};

const PAYABLE_COLUMNS: &str = r#"
    id, source, source_id, party, amount_cents, paid_cents, created_at, updated_at
"#;

/// Repository for payable database operations.
#[derive(Debug, Clone)]
pub struct PayableRepository {
    pool: SqlitePool,
}

impl PayableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PayableRepository { pool }
    }

    /// Lists payables, oldest first. `open_only` hides settled ones.
    pub async fn list(&self, open_only: bool) -> DbResult<Vec<Payable>> {
        let sql = format!(
            r#"
            SELECT {PAYABLE_COLUMNS}
            FROM payables
            WHERE (?1 = 0 OR paid_cents < amount_cents)
            ORDER BY created_at ASC
            "#
        );

        let payables = sqlx::query_as::<_, Payable>(&sql)
            .bind(open_only)
            .fetch_all(&self.pool)
            .await?;

        Ok(payables)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Payable>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut conn, id).await
    }

    /// Payments made against a payable, oldest first.
    pub async fn settlements(&self, payable_id: &str) -> DbResult<Vec<PayableSettlement>> {
        let settlements = sqlx::query_as::<_, PayableSettlement>(
            r#"
            SELECT id, payable_id, cash_cents, digital_cents, created_by, created_at
            FROM payable_settlements
            WHERE payable_id = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(payable_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(settlements)
    }

    /// Pays part or all of a payable.
    ///
    /// ## Rules
    /// - The settlement must be positive and not exceed what remains
    /// - A fully paid payable has nothing outstanding to settle
    pub async fn settle(&self, id: &str, settlement: &Settlement, actor: &str) -> DbResult<Payable> {
        debug!(id = %id, amount = settlement.total().cents(), "Settling payable");

        let mut tx = self.pool.begin().await?;

        let payable = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Payable", id))?;

        if payable.is_settled() {
            return Err(haze_core::CoreError::NothingOutstanding(format!(
                "payable to {}",
                payable.party
            ))
            .into());
        }

        let paid = settlement.validate_against(payable.remaining())?;
        let now = Utc::now();

        let record = PayableSettlement {
            id: generate_id(),
            payable_id: payable.id.clone(),
            cash_cents: settlement.cash_cents,
            digital_cents: settlement.digital_cents,
            created_by: actor.to_string(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO payable_settlements (
                id, payable_id, cash_cents, digital_cents, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&record.id)
        .bind(&record.payable_id)
        .bind(record.cash_cents)
        .bind(record.digital_cents)
        .bind(&record.created_by)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE payables SET paid_cents = paid_cents + ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&payable.id)
            .bind(paid.cents())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let updated = Payable {
            paid_cents: payable.paid_cents + paid.cents(),
            updated_at: now,
            ..payable
        };

        log::append_in(
            &mut tx,
            actor,
            format!(
                "Paid {} to {} (cash {}, digital {}); {} remaining",
                paid,
                updated.party,
                Money::from_cents(settlement.cash_cents),
                Money::from_cents(settlement.digital_cents),
                updated.remaining(),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, paid = paid.cents(), remaining = updated.remaining().cents(), "Payable settled");
        Ok(updated)
    }
}

/// Loads a payable on an existing connection or transaction.
async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Payable>> {
    let sql = format!("SELECT {PAYABLE_COLUMNS} FROM payables WHERE id = ?1");
    let payable = sqlx::query_as::<_, Payable>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(payable)
}

/// Opens a payable on an existing transaction.
pub(crate) async fn open_in(
    conn: &mut SqliteConnection,
    source: PayableSource,
    source_id: &str,
    party: &str,
    amount: Money,
) -> DbResult<Payable> {
    let now = Utc::now();
    let payable = Payable {
        id: generate_id(),
        source,
        source_id: source_id.to_string(),
        party: party.to_string(),
        amount_cents: amount.cents(),
        paid_cents: 0,
        created_at: now,
        updated_at: now,
    };

    debug!(party = %payable.party, amount = payable.amount_cents, "Opening payable");

    sqlx::query(
        r#"
        INSERT INTO payables (
            id, source, source_id, party, amount_cents, paid_cents, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payable.id)
    .bind(payable.source)
    .bind(&payable.source_id)
    .bind(&payable.party)
    .bind(payable.amount_cents)
    .bind(payable.paid_cents)
    .bind(payable.created_at)
    .bind(payable.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(payable)
}
