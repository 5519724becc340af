//! Activity log search. Admin only.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use haze_core::input::LogFilter;
use haze_core::LogEntry;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/logs", get(list_logs))
}

/// `GET /api/logs?search=&actor=&from=&to=&limit=`, newest first.
pub async fn list_logs(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<LogFilter>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    user.require_admin()?;
    filter.validate()?;
    Ok(Json(state.db.logs().list(&filter).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, admin, staff};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_mutations_are_logged_and_searchable() {
        let state = test_support::state().await;
        test_support::product(&state, "Mango Ice", 3).await;
        state.db.logs().append("Rafi", "Opened the till").await.unwrap();

        let Json(all) = list_logs(State(state.clone()), admin(), ApiQuery(LogFilter::default()))
            .await
            .unwrap();
        assert!(all.len() >= 2);

        let Json(by_rafi) = list_logs(
            State(state.clone()),
            admin(),
            ApiQuery(LogFilter {
                actor: Some("Rafi".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(by_rafi.len(), 1);
        assert_eq!(by_rafi[0].action, "Opened the till");

        let Json(mango) = list_logs(
            State(state),
            admin(),
            ApiQuery(LogFilter {
                search: Some("mango".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert!(!mango.is_empty());
        assert!(mango.iter().all(|e| e.action.to_lowercase().contains("mango")));
    }

    #[tokio::test]
    async fn test_staff_cannot_read_logs() {
        let state = test_support::state().await;
        let err = list_logs(State(state), staff(), ApiQuery(LogFilter::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
