//! Liveness check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub store_name: String,
    pub currency_symbol: String,
    pub version: &'static str,
    pub server_time: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(check))
}

/// `GET /health`: 200 when the database answers, 503 otherwise.
pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    if !database {
        warn!("Health check failed: database unreachable");
    }

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            database,
            store_name: state.config.store_name.clone(),
            currency_symbol: state.config.currency_symbol.clone(),
            version: env!("CARGO_PKG_VERSION"),
            server_time: Utc::now().to_rfc3339(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn test_health_ok() {
        let state = test_support::state().await;
        let (status, Json(body)) = check(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.database);
        assert_eq!(body.store_name, "Haze Vape Shop");
    }
}
