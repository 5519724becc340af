//! # Capital Repository
//!
//! Owner investments and withdrawals. These move cash / digital balances
//! but never touch profit.

use chrono::Utc;
use haze_core::input::NewCapitalEntry;
use haze_core::{CapitalEntry, CapitalKind, Flow};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::{clean, generate_id, log, today};

#[derive(Debug, FromRow)]
struct FlowRow {
    cash: i64,
    digital: i64,
}

/// Repository for owner capital entries.
#[derive(Debug, Clone)]
pub struct CapitalRepository {
    pool: SqlitePool,
}

impl CapitalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CapitalRepository { pool }
    }

    /// Lists all capital entries, newest first.
    pub async fn list(&self) -> DbResult<Vec<CapitalEntry>> {
        let entries = sqlx::query_as::<_, CapitalEntry>(
            r#"
            SELECT id, date, kind, amount_cents, cash_cents, digital_cents,
                   note, created_by, created_at
            FROM capital_entries
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Net owner capital per channel: investments minus withdrawals.
    pub async fn net(&self) -> DbResult<Flow> {
        let row = sqlx::query_as::<_, FlowRow>(
            r#"
            SELECT
                COALESCE(SUM(CASE kind WHEN 'investment' THEN cash_cents ELSE -cash_cents END), 0) AS cash,
                COALESCE(SUM(CASE kind WHEN 'investment' THEN digital_cents ELSE -digital_cents END), 0) AS digital
            FROM capital_entries
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Flow::new(row.cash, row.digital))
    }

    /// Records an investment or withdrawal.
    ///
    /// ## Rules
    /// - Amount must be positive
    /// - Cash + digital must equal the amount; capital is never due
    pub async fn create(&self, new: &NewCapitalEntry, actor: &str) -> DbResult<CapitalEntry> {
        new.validate()?;

        let split = new.split();
        let entry = CapitalEntry {
            id: generate_id(),
            date: new.date.unwrap_or_else(today),
            kind: new.kind,
            amount_cents: new.amount_cents,
            cash_cents: split.cash_cents,
            digital_cents: split.digital_cents,
            note: clean(new.note.as_deref()),
            created_by: actor.to_string(),
            created_at: Utc::now(),
        };

        debug!(kind = ?entry.kind, amount = entry.amount_cents, "Recording capital entry");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO capital_entries (
                id, date, kind, amount_cents, cash_cents, digital_cents,
                note, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.date)
        .bind(entry.kind)
        .bind(entry.amount_cents)
        .bind(entry.cash_cents)
        .bind(entry.digital_cents)
        .bind(&entry.note)
        .bind(&entry.created_by)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        let verb = match entry.kind {
            CapitalKind::Investment => "Invested",
            CapitalKind::Withdrawal => "Withdrew",
        };
        log::append_in(
            &mut tx,
            actor,
            format!(
                "{verb} {} owner capital (cash {}, digital {})",
                split.paid(),
                split.cash(),
                split.digital(),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(id = %entry.id, kind = ?entry.kind, amount = entry.amount_cents, "Capital entry recorded");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::db;
    use haze_core::{CoreError, PaymentSplit};

    fn entry(kind: CapitalKind, amount: i64, payment: Option<PaymentSplit>) -> NewCapitalEntry {
        NewCapitalEntry {
            date: None,
            kind,
            amount_cents: amount,
            payment,
            note: Some("opening float".to_string()),
        }
    }

    #[tokio::test]
    async fn test_net_capital_by_channel() {
        let db = db().await;
        let repo = db.capital();

        repo.create(
            &entry(
                CapitalKind::Investment,
                100_000,
                Some(PaymentSplit::new(60_000, 40_000, 0)),
            ),
            "owner",
        )
        .await
        .unwrap();
        repo.create(&entry(CapitalKind::Withdrawal, 10_000, None), "owner")
            .await
            .unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(repo.net().await.unwrap(), Flow::new(50_000, 40_000));
        assert_eq!(db.logs().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_capital_cannot_carry_due() {
        let db = db().await;
        let err = db
            .capital()
            .create(
                &entry(
                    CapitalKind::Investment,
                    10_000,
                    Some(PaymentSplit::new(5_000, 0, 5_000)),
                ),
                "owner",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::CapitalWithDue)));
        assert!(db.capital().list().await.unwrap().is_empty());
    }
}
