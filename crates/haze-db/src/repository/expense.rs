//! # Expense Repository
//!
//! Manual expenses (rent, utilities, wages) and the system-generated
//! write-offs booked by [`super::product::ProductRepository::write_off`].
//!
//! An expense with a due part opens a payable, the same way a restock does.

use chrono::Utc;
use haze_core::input::{ExpenseFilter, NewExpense};
use haze_core::{Expense, Money, PayableSource};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{clean, generate_id, log, payable, today};

const EXPENSE_COLUMNS: &str = r#"
    id, date, category, description, amount_cents,
    cash_cents, digital_cents, due_cents,
    system_generated, product_id, created_by, created_at
"#;

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Lists expenses newest first, write-offs included.
    pub async fn list(&self, filter: &ExpenseFilter) -> DbResult<Vec<Expense>> {
        let category = clean(filter.category.as_deref());

        debug!(from = ?filter.from, to = ?filter.to, category = ?category, "Listing expenses");

        let sql = format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses
            WHERE (?1 IS NULL OR date >= ?1)
              AND (?2 IS NULL OR date <= ?2)
              AND (?3 IS NULL OR category = ?3 COLLATE NOCASE)
            ORDER BY date DESC, created_at DESC
            "#
        );

        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(expenses)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Expense>> {
        let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1");
        let expense = sqlx::query_as::<_, Expense>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expense)
    }

    /// Records a manual expense.
    pub async fn create(&self, new: &NewExpense, actor: &str) -> DbResult<Expense> {
        new.validate()?;

        let split = new.split();
        let expense = Expense {
            id: generate_id(),
            date: new.date.unwrap_or_else(today),
            category: new.category.trim().to_string(),
            description: clean(new.description.as_deref()),
            amount_cents: new.amount_cents,
            cash_cents: split.cash_cents,
            digital_cents: split.digital_cents,
            due_cents: split.due_cents,
            system_generated: false,
            product_id: None,
            created_by: actor.to_string(),
            created_at: Utc::now(),
        };

        debug!(category = %expense.category, amount = expense.amount_cents, "Recording expense");

        let mut tx = self.pool.begin().await?;

        insert_in(&mut tx, &expense).await?;

        if expense.due_cents > 0 {
            let party = clean(new.payee.as_deref()).unwrap_or_else(|| expense.category.clone());
            payable::open_in(
                &mut tx,
                PayableSource::Expense,
                &expense.id,
                &party,
                Money::from_cents(expense.due_cents),
            )
            .await?;
        }

        log::append_in(
            &mut tx,
            actor,
            format!(
                "Recorded {} expense of {}{} (cash {}, digital {}, due {})",
                expense.category,
                expense.amount(),
                expense
                    .description
                    .as_deref()
                    .map(|d| format!(": {d}"))
                    .unwrap_or_default(),
                expense.payment().cash(),
                expense.payment().digital(),
                expense.payment().due(),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(id = %expense.id, amount = expense.amount_cents, "Expense recorded");
        Ok(expense)
    }

    /// Deletes a manual expense and its unpaid payable.
    ///
    /// ## Rules
    /// - System-generated write-offs cannot be deleted
    /// - An expense whose payable has been partly settled cannot be deleted
    pub async fn delete(&self, id: &str, actor: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting expense");

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1");
        let expense = sqlx::query_as::<_, Expense>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))?;

        if expense.system_generated {
            return Err(DbError::in_use(
                "Expense",
                id,
                "system-generated write-offs cannot be deleted",
            ));
        }

        let settled: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(paid_cents), 0)
            FROM payables
            WHERE source = 'expense' AND source_id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if settled > 0 {
            return Err(DbError::in_use(
                "Expense",
                id,
                format!("{} already paid against its payable", Money::from_cents(settled)),
            ));
        }

        sqlx::query("DELETE FROM payables WHERE source = 'expense' AND source_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        log::append_in(
            &mut tx,
            actor,
            format!("Deleted {} expense of {}", expense.category, expense.amount()),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, "Expense deleted");
        Ok(())
    }
}

/// Inserts an expense row on an existing connection or transaction.
pub(crate) async fn insert_in(conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO expenses (
            id, date, category, description, amount_cents,
            cash_cents, digital_cents, due_cents,
            system_generated, product_id, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&expense.id)
    .bind(expense.date)
    .bind(&expense.category)
    .bind(&expense.description)
    .bind(expense.amount_cents)
    .bind(expense.cash_cents)
    .bind(expense.digital_cents)
    .bind(expense.due_cents)
    .bind(expense.system_generated)
    .bind(&expense.product_id)
    .bind(&expense.created_by)
    .bind(expense.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
