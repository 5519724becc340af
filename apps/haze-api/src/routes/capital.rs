//! Owner capital: investments in, withdrawals out. Admin only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use haze_core::input::NewCapitalEntry;
use haze_core::{CapitalEntry, Flow};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalOverview {
    pub entries: Vec<CapitalEntry>,
    /// Investments minus withdrawals, per channel.
    pub net: Flow,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/capital", get(list_capital).post(create_capital))
}

/// `GET /api/capital`
pub async fn list_capital(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<CapitalOverview>> {
    user.require_admin()?;
    let repo = state.db.capital();
    let entries = repo.list().await?;
    let net = repo.net().await?;
    Ok(Json(CapitalOverview { entries, net }))
}

/// `POST /api/capital`
pub async fn create_capital(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewCapitalEntry>,
) -> ApiResult<(StatusCode, Json<CapitalEntry>)> {
    user.require_admin()?;
    let entry = state.db.capital().create(&new, &user.name).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{self, admin, staff};
    use haze_core::{CapitalKind, Money, PaymentSplit};

    fn entry(kind: CapitalKind, amount: i64, payment: PaymentSplit) -> NewCapitalEntry {
        NewCapitalEntry {
            date: None,
            kind,
            amount_cents: amount,
            payment: Some(payment),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_net_balances() {
        let state = test_support::state().await;

        create_capital(
            State(state.clone()),
            admin(),
            ApiJson(entry(
                CapitalKind::Investment,
                100_000,
                PaymentSplit::new(60_000, 40_000, 0),
            )),
        )
        .await
        .unwrap();
        create_capital(
            State(state.clone()),
            admin(),
            ApiJson(entry(
                CapitalKind::Withdrawal,
                10_000,
                PaymentSplit::new(10_000, 0, 0),
            )),
        )
        .await
        .unwrap();

        let Json(overview) = list_capital(State(state), admin()).await.unwrap();
        assert_eq!(overview.entries.len(), 2);
        assert_eq!(overview.net.cash, Money::from_cents(50_000));
        assert_eq!(overview.net.digital, Money::from_cents(40_000));
    }

    #[tokio::test]
    async fn test_capital_rejects_due_and_staff() {
        let state = test_support::state().await;

        let err = create_capital(
            State(state.clone()),
            admin(),
            ApiJson(entry(
                CapitalKind::Investment,
                1_000,
                PaymentSplit::new(500, 0, 500),
            )),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);

        let err = list_capital(State(state), staff()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
