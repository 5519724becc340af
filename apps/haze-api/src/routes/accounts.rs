//! Payables, receivables and the financial summary. Admin only.
//!
//! ```text
//!   GET  /api/accounts/payables?all=true      open (or all) supplier dues
//!   POST /api/accounts/payables/{id}/settle   { cashCents, digitalCents }
//!   GET  /api/accounts/receivables            sales with money still due
//!   GET  /api/accounts/summary?from=&to=      profit, balances, inventory
//! ```

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use haze_core::input::DateRange;
use haze_core::{FinancialSummary, Payable, PayableSettlement, Sale, Settlement};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PayableQuery {
    /// Include fully settled payables.
    #[serde(default)]
    pub all: bool,
}

/// A payable with its settlement history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayableDetail {
    #[serde(flatten)]
    pub payable: Payable,
    pub settlements: Vec<PayableSettlement>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/accounts/payables", get(list_payables))
        .route("/api/accounts/payables/{id}", get(get_payable))
        .route("/api/accounts/payables/{id}/settle", post(settle_payable))
        .route("/api/accounts/receivables", get(list_receivables))
        .route("/api/accounts/summary", get(summary))
}

/// `GET /api/accounts/payables`
pub async fn list_payables(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<PayableQuery>,
) -> ApiResult<Json<Vec<Payable>>> {
    user.require_admin()?;
    Ok(Json(state.db.payables().list(!query.all).await?))
}

/// `GET /api/accounts/payables/{id}`
pub async fn get_payable(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PayableDetail>> {
    user.require_admin()?;
    let repo = state.db.payables();
    let payable = repo
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Payable", &id))?;
    let settlements = repo.settlements(&id).await?;
    Ok(Json(PayableDetail {
        payable,
        settlements,
    }))
}

/// `POST /api/accounts/payables/{id}/settle`
pub async fn settle_payable(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(settlement): ApiJson<Settlement>,
) -> ApiResult<Json<Payable>> {
    user.require_admin()?;
    Ok(Json(
        state
            .db
            .payables()
            .settle(&id, &settlement, &user.name)
            .await?,
    ))
}

/// `GET /api/accounts/receivables`
pub async fn list_receivables(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Sale>>> {
    user.require_admin()?;
    Ok(Json(state.db.sales().receivables().await?))
}

/// `GET /api/accounts/summary?from=&to=`
pub async fn summary(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(range): ApiQuery<DateRange>,
) -> ApiResult<Json<FinancialSummary>> {
    user.require_admin()?;
    Ok(Json(state.db.reports().summary(&range).await?))
}
