//! # Activity Log Repository
//!
//! Append-only trail of who did what. Entries are written by the other
//! repositories inside their own transactions via [`append_in`], so a
//! change and its log line commit or roll back together.

use chrono::Utc;
use haze_core::input::LogFilter;
use haze_core::LogEntry;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{clean, contains_pattern, generate_id};

/// Repository for activity log operations.
#[derive(Debug, Clone)]
pub struct ActivityLogRepository {
    pool: SqlitePool,
}

impl ActivityLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ActivityLogRepository { pool }
    }

    /// Appends a standalone entry (login events, bootstrap).
    pub async fn append(&self, actor: &str, action: impl Into<String>) -> DbResult<LogEntry> {
        let mut conn = self.pool.acquire().await?;
        append_in(&mut conn, actor, action).await
    }

    /// Lists entries newest first.
    ///
    /// ## Filters
    /// - `search`: case-insensitive substring of the action
    /// - `actor`: exact actor name (case-insensitive)
    /// - `from` / `to`: inclusive calendar dates (UTC)
    /// - `limit`: page size, clamped to 1..=1000
    pub async fn list(&self, filter: &LogFilter) -> DbResult<Vec<LogEntry>> {
        let search = clean(filter.search.as_deref());
        let actor = clean(filter.actor.as_deref());
        let pattern = search.as_deref().map(contains_pattern);

        debug!(search = ?search, actor = ?actor, "Listing activity log");

        let entries = sqlx::query_as::<_, LogEntry>(
            r#"
            SELECT id, timestamp, actor, action
            FROM activity_logs
            WHERE (?1 IS NULL OR action LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR actor = ?2 COLLATE NOCASE)
              AND (?3 IS NULL OR substr(timestamp, 1, 10) >= ?3)
              AND (?4 IS NULL OR substr(timestamp, 1, 10) <= ?4)
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?5
            "#,
        )
        .bind(pattern)
        .bind(actor)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.effective_limit())
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Total number of entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Appends an entry on an existing connection or transaction.
pub(crate) async fn append_in(
    conn: &mut SqliteConnection,
    actor: &str,
    action: impl Into<String>,
) -> DbResult<LogEntry> {
    let entry = LogEntry {
        id: generate_id(),
        timestamp: Utc::now(),
        actor: actor.to_string(),
        action: action.into(),
    };

    debug!(actor = %entry.actor, action = %entry.action, "Appending activity log");

    sqlx::query("INSERT INTO activity_logs (id, timestamp, actor, action) VALUES (?1, ?2, ?3, ?4)")
        .bind(&entry.id)
        .bind(entry.timestamp)
        .bind(&entry.actor)
        .bind(&entry.action)
        .execute(&mut *conn)
        .await?;

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;

    #[tokio::test]
    async fn test_append_and_filter() {
        let db = db().await;
        let logs = db.logs();

        logs.append("Rafi", "Recorded sale of 2 items").await.unwrap();
        logs.append("Nadia", "Restocked Mango Ice 30ml").await.unwrap();
        logs.append("Rafi", "Flagged sale for review").await.unwrap();

        let all = logs.list(&LogFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        // Newest first
        assert_eq!(all[0].action, "Flagged sale for review");

        let by_actor = logs
            .list(&LogFilter {
                actor: Some("rafi".to_string()),
                ..LogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_actor.len(), 2);

        let by_text = logs
            .list(&LogFilter {
                search: Some("restock".to_string()),
                ..LogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].actor, "Nadia");
    }

    #[tokio::test]
    async fn test_search_wildcards_are_literal() {
        let db = db().await;
        let logs = db.logs();

        logs.append("Rafi", "Applied 10% discount").await.unwrap();
        logs.append("Rafi", "Renamed Ice_Pod").await.unwrap();
        logs.append("Rafi", "Recorded sale of 2 items").await.unwrap();

        let percent = logs
            .list(&LogFilter {
                search: Some("%".to_string()),
                ..LogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].action, "Applied 10% discount");

        let underscore = logs
            .list(&LogFilter {
                search: Some("_".to_string()),
                ..LogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].action, "Renamed Ice_Pod");
    }

    #[tokio::test]
    async fn test_date_window_and_limit() {
        let db = db().await;
        let logs = db.logs();
        for i in 0..5 {
            logs.append("system", format!("entry {i}")).await.unwrap();
        }

        let today = Utc::now().date_naive();
        let window = logs
            .list(&LogFilter {
                from: Some(today),
                to: Some(today),
                limit: Some(2),
                ..LogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(window.len(), 2);

        let yesterday = today.pred_opt().unwrap();
        let empty = logs
            .list(&LogFilter {
                to: Some(yesterday),
                ..LogFilter::default()
            })
            .await
            .unwrap();
        assert!(empty.is_empty());
    }
}
