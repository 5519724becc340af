//! Login and the current-user endpoint.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use haze_core::{CoreError, ManagedUser};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: ManagedUser,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

/// `POST /api/auth/login`
///
/// Unknown email and wrong password give the same 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state.db.users().find_by_email(request.email.trim()).await?;

    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash).await => user,
        _ => {
            warn!(email = %request.email.trim(), "Failed login attempt");
            return Err(CoreError::InvalidCredentials.into());
        }
    };

    let token = state.jwt.issue(&user)?;
    state.db.logs().append(&user.name, "Logged in").await?;

    info!(user_id = %user.id, role = user.role.as_str(), "User logged in");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.jwt.lifetime_secs(),
        user,
    }))
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<ManagedUser>> {
    let found = state
        .db
        .users()
        .get_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;
    Ok(Json(found))
}
