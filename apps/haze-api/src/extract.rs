//! # Request Extractors
//!
//! `Json` and `Query` wrappers whose rejections are [`ApiError`]s, so a
//! malformed body or query string gets the same `{ error, code, details }`
//! body as every other 400.
//!
//! ```text
//!   {"items":"nope"} ──► axum::Json<NewSale> ──► JsonRejection
//!                                                    │
//!                                                    ▼
//!                              ApiError { code: VALIDATION_ERROR } ──► 400
//! ```

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                debug!(reason = %rejection.body_text(), "Rejected request body");
                Err(rejection.into())
            }
        }
    }
}

/// Query string parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => {
                debug!(reason = %rejection.body_text(), "Rejected query string");
                Err(rejection.into())
            }
        }
    }
}
