//! User management. Admin only.
//!
//! Passwords are hashed here before they reach the repository; the
//! stored hash is never serialized back out.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use haze_core::input::{NewUser, UserUpdate};
use haze_core::ManagedUser;

use crate::auth::{hash_password, AuthUser};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", put(update_user).delete(delete_user))
}

/// `GET /api/users`
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ManagedUser>>> {
    user.require_admin()?;
    Ok(Json(state.db.users().list().await?))
}

/// `POST /api/users`: 409 when the email is taken.
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<ManagedUser>)> {
    user.require_admin()?;
    new.validate()?;

    let hash = hash_password(&new.password).await?;
    let created = state.db.users().create(&new, &hash, &user.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/users/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult<Json<ManagedUser>> {
    user.require_admin()?;
    update.validate()?;

    let hash = match update.password.as_deref() {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };
    let updated = state
        .db
        .users()
        .update(&id, &update, hash.as_deref(), &user.name)
        .await?;
    Ok(Json(updated))
}

/// `DELETE /api/users/{id}`: the last admin is never removed.
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;
    state.db.users().delete(&id, &user.name).await?;
    Ok(StatusCode::NO_CONTENT)
}
