//! Running costs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use haze_core::input::{ExpenseFilter, NewExpense};
use haze_core::Expense;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/expenses", get(list_expenses).post(create_expense))
        .route("/api/expenses/{id}", delete(delete_expense))
}

/// `GET /api/expenses?from=&to=&category=`
///
/// Includes system-generated write-offs; clients tell them apart by
/// `systemGenerated`.
pub async fn list_expenses(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(filter): ApiQuery<ExpenseFilter>,
) -> ApiResult<Json<Vec<Expense>>> {
    filter.validate()?;
    Ok(Json(state.db.expenses().list(&filter).await?))
}

/// `POST /api/expenses`: any due part opens a payable to the payee.
pub async fn create_expense(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewExpense>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let expense = state.db.expenses().create(&new, &user.name).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// `DELETE /api/expenses/{id}`
pub async fn delete_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;
    state.db.expenses().delete(&id, &user.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{self, admin, staff};
    use haze_core::input::WriteOff;
    use haze_core::PaymentSplit;

    fn rent(payment: PaymentSplit) -> NewExpense {
        NewExpense {
            date: None,
            category: "Rent".to_string(),
            description: Some("October".to_string()),
            amount_cents: 50_000,
            payment: Some(payment),
            payee: Some("Landlord".to_string()),
        }
    }

    #[tokio::test]
    async fn test_expense_with_due_opens_payable() {
        let state = test_support::state().await;

        let (status, Json(expense)) = create_expense(
            State(state.clone()),
            staff(),
            ApiJson(rent(PaymentSplit::new(20_000, 0, 30_000))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(expense.created_by, "Rafi");

        let payables = state.db.payables().list(true).await.unwrap();
        assert_eq!(payables.len(), 1);
        assert_eq!(payables[0].amount_cents, 30_000);
    }

    #[tokio::test]
    async fn test_split_mismatch_rejected() {
        let state = test_support::state().await;
        let err = create_expense(
            State(state),
            staff(),
            ApiJson(rent(PaymentSplit::new(20_000, 0, 0))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_write_offs_cannot_be_deleted() {
        let state = test_support::state().await;
        let product = test_support::product(&state, "Coil Pack", 4).await;
        let write_off = state
            .db
            .products()
            .write_off(
                &product.product.id,
                haze_core::input::WriteOffKind::Damaged,
                &WriteOff {
                    quantity: 1,
                    note: None,
                },
                "Rafi",
            )
            .await
            .unwrap();

        let err = delete_expense(State(state.clone()), admin(), Path(write_off.id))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let (_, Json(manual)) = create_expense(
            State(state.clone()),
            staff(),
            ApiJson(rent(PaymentSplit::new(50_000, 0, 0))),
        )
        .await
        .unwrap();
        let err = delete_expense(State(state.clone()), staff(), Path(manual.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        delete_expense(State(state.clone()), admin(), Path(manual.id))
            .await
            .unwrap();

        let Json(left) = list_expenses(State(state), staff(), ApiQuery(ExpenseFilter::default()))
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert!(left[0].system_generated);
    }
}
