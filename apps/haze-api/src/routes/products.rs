//! Product catalogue, restocking and write-offs.
//!
//! Staff can list products and record damaged units or testers; catalogue
//! changes and restocking are admin-only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use haze_core::input::{NewBatch, NewProduct, ProductFilter, ProductUpdate, WriteOff, WriteOffKind};
use haze_core::{AcquisitionBatch, Expense, Product, ProductWithStock};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

/// A product with its derived stock and every acquisition batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductWithStock,
    pub batches: Vec<AcquisitionBatch>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/categories", get(list_categories))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/products/{id}/restock", post(restock_product))
        .route("/api/products/{id}/damaged", post(mark_damaged))
        .route("/api/products/{id}/testers", post(move_to_testers))
}

/// `GET /api/products?category=&search=&low_stock=`
pub async fn list_products(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Json<Vec<ProductWithStock>>> {
    filter.validate()?;
    Ok(Json(state.db.products().list(&filter).await?))
}

/// `GET /api/products/categories`
pub async fn list_categories(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.db.products().categories().await?))
}

/// `POST /api/products`
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<ProductWithStock>)> {
    user.require_admin()?;
    let created = state.db.products().create(&new, &user.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/products/{id}`
pub async fn get_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductDetail>> {
    let repo = state.db.products();
    let product = repo
        .get_with_stock(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    let batches = repo.batches(&id).await?;
    Ok(Json(ProductDetail { product, batches }))
}

/// `PUT /api/products/{id}`
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    user.require_admin()?;
    Ok(Json(state.db.products().update(&id, &update, &user.name).await?))
}

/// `DELETE /api/products/{id}`: 409 once the product has been sold.
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;
    state.db.products().delete(&id, &user.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/products/{id}/restock`
pub async fn restock_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(batch): ApiJson<NewBatch>,
) -> ApiResult<(StatusCode, Json<AcquisitionBatch>)> {
    user.require_admin()?;
    let batch = state.db.products().restock(&id, &batch, &user.name).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// `POST /api/products/{id}/damaged`
pub async fn mark_damaged(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(write_off): ApiJson<WriteOff>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    write_off_units(state, user, id, WriteOffKind::Damaged, write_off).await
}

/// `POST /api/products/{id}/testers`
pub async fn move_to_testers(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(write_off): ApiJson<WriteOff>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    write_off_units(state, user, id, WriteOffKind::Tester, write_off).await
}

async fn write_off_units(
    state: AppState,
    user: AuthUser,
    id: String,
    kind: WriteOffKind,
    write_off: WriteOff,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let expense = state
        .db
        .products()
        .write_off(&id, kind, &write_off, &user.name)
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{self, admin, staff};

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: "Disposables".to_string(),
            cost_price_cents: 600,
            selling_price_cents: 1100,
            low_stock_threshold: Some(3),
            initial_stock: Some(NewBatch {
                date: None,
                quantity: 10,
                cost_price_cents: None,
                supplier: Some("Cloud Nine Supply".to_string()),
                payment: None,
                note: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_detail() {
        let state = test_support::state().await;

        let (status, Json(created)) = create_product(
            State(state.clone()),
            admin(),
            ApiJson(new_product("Disposable Grape")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.current_stock, 10);

        let Json(detail) = get_product(State(state), staff(), Path(created.product.id.clone()))
            .await
            .unwrap();
        assert_eq!(detail.batches.len(), 1);
        assert_eq!(detail.product.stock_value_cents, 6_000);
    }

    #[tokio::test]
    async fn test_staff_cannot_change_catalogue() {
        let state = test_support::state().await;
        let product = test_support::product(&state, "Mango Ice", 5).await;

        let err = create_product(State(state.clone()), staff(), ApiJson(new_product("Blocked")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = delete_product(State(state), staff(), Path(product.product.id))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_testers_reduce_stock_and_book_expense() {
        let state = test_support::state().await;
        let product = test_support::product(&state, "Mint Freeze", 5).await;
        let id = product.product.id.clone();

        let (_, Json(expense)) = move_to_testers(
            State(state.clone()),
            staff(),
            Path(id.clone()),
            ApiJson(WriteOff {
                quantity: 2,
                note: None,
            }),
        )
        .await
        .unwrap();
        assert!(expense.system_generated);
        assert_eq!(expense.amount_cents, 1_600);

        let err = mark_damaged(
            State(state.clone()),
            staff(),
            Path(id.clone()),
            ApiJson(WriteOff {
                quantity: 4,
                note: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let Json(list) = list_products(State(state), staff(), ApiQuery(ProductFilter::default()))
            .await
            .unwrap();
        assert_eq!(list[0].current_stock, 3);
        assert_eq!(list[0].stock.tester, 2);
    }

    #[tokio::test]
    async fn test_missing_product_is_404() {
        let state = test_support::state().await;
        let err = get_product(State(state), staff(), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
