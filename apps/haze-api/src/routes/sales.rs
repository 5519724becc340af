//! Sales: recording, receivable payments, review flags.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use haze_core::input::{NewSale, SaleFilter, SaleFlag};
use haze_core::{Sale, SaleDetail, Settlement};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/sales", get(list_sales).post(create_sale))
        .route("/api/sales/{id}", get(get_sale).delete(delete_sale))
        .route("/api/sales/{id}/payments", post(record_payment))
        .route("/api/sales/{id}/flag", put(flag_sale))
}

/// `GET /api/sales?from=&to=&status=&flagged=`
pub async fn list_sales(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(filter): ApiQuery<SaleFilter>,
) -> ApiResult<Json<Vec<Sale>>> {
    filter.validate()?;
    Ok(Json(state.db.sales().list(&filter).await?))
}

/// `POST /api/sales`
///
/// Stock and the payment split are checked inside one transaction; a
/// rejected sale writes nothing.
pub async fn create_sale(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewSale>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let sale = state.db.sales().create(&new, &user.name).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// `GET /api/sales/{id}`
pub async fn get_sale(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    state
        .db
        .sales()
        .get_detail(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Sale", &id))
}

/// `POST /api/sales/{id}/payments`
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(settlement): ApiJson<Settlement>,
) -> ApiResult<Json<Sale>> {
    Ok(Json(
        state
            .db
            .sales()
            .record_payment(&id, &settlement, &user.name)
            .await?,
    ))
}

/// `PUT /api/sales/{id}/flag`
pub async fn flag_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(flag): ApiJson<SaleFlag>,
) -> ApiResult<Json<Sale>> {
    Ok(Json(state.db.sales().set_flag(&id, &flag, &user.name).await?))
}

/// `DELETE /api/sales/{id}`: sold units return to stock.
pub async fn delete_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;
    state.db.sales().delete(&id, &user.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{self, admin, staff};
    use haze_core::input::NewSaleItem;
    use haze_core::{PaymentSplit, PaymentStatus};

    fn sale_of(product_id: &str, quantity: i64, payment: PaymentSplit) -> NewSale {
        NewSale {
            date: None,
            customer_name: Some("Tanvir".to_string()),
            customer_phone: None,
            items: vec![NewSaleItem {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents: None,
            }],
            payment,
        }
    }

    #[tokio::test]
    async fn test_sale_on_credit_then_paid() {
        let state = test_support::state().await;
        let product = test_support::product(&state, "Blue Razz", 6).await;

        let (status, Json(detail)) = create_sale(
            State(state.clone()),
            staff(),
            ApiJson(sale_of(&product.product.id, 2, PaymentSplit::new(1_000, 0, 1_800))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(detail.status, PaymentStatus::Partial);
        assert_eq!(detail.items[0].unit_price_cents, 1_400);

        let id = detail.sale.id.clone();
        let err = record_payment(
            State(state.clone()),
            staff(),
            Path(id.clone()),
            ApiJson(Settlement::new(2_000, 0)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);

        let Json(paid) = record_payment(
            State(state.clone()),
            staff(),
            Path(id.clone()),
            ApiJson(Settlement::new(800, 1_000)),
        )
        .await
        .unwrap();
        assert_eq!(paid.due_cents, 0);
        assert_eq!(paid.cash_cents + paid.digital_cents, paid.total_cents);

        let Json(unpaid) = list_sales(
            State(state),
            staff(),
            ApiQuery(SaleFilter {
                status: Some(PaymentStatus::Due),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert!(unpaid.is_empty());
    }

    #[tokio::test]
    async fn test_oversell_is_conflict() {
        let state = test_support::state().await;
        let product = test_support::product(&state, "Strawberry Kiwi", 1).await;

        let err = create_sale(
            State(state),
            staff(),
            ApiJson(sale_of(&product.product.id, 2, PaymentSplit::new(2_800, 0, 0))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.details.unwrap()["available"], 1);
    }

    #[tokio::test]
    async fn test_flag_and_admin_delete() {
        let state = test_support::state().await;
        let product = test_support::product(&state, "Pod Kit", 3).await;

        let (_, Json(detail)) = create_sale(
            State(state.clone()),
            staff(),
            ApiJson(sale_of(&product.product.id, 1, PaymentSplit::new(1_400, 0, 0))),
        )
        .await
        .unwrap();
        let id = detail.sale.id;

        let Json(flagged) = flag_sale(
            State(state.clone()),
            staff(),
            Path(id.clone()),
            ApiJson(SaleFlag {
                flagged: true,
                comment: Some("Customer says change was short".to_string()),
            }),
        )
        .await
        .unwrap();
        assert!(flagged.flagged);

        let err = delete_sale(State(state.clone()), staff(), Path(id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let status = delete_sale(State(state.clone()), admin(), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_sale(State(state), staff(), Path(id)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
