//! # Haze API
//!
//! REST server for the Haze Ledger shop backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Haze API Server                                │
//! │                                                                         │
//! │  Client ──► axum (8080) ──► request span ──► AuthUser ──► handler       │
//! │                                                             │           │
//! │                                                             ▼           │
//! │                                                haze-db repositories     │
//! │                                                (one sqlx transaction    │
//! │                                                 per mutation + log)     │
//! │                                                             │           │
//! │                                                             ▼           │
//! │                                                        SQLite (WAL)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`]: layered `ServerConfig`
//! - [`auth`]: passwords, JWTs and the [`auth::AuthUser`] extractor
//! - [`error`]: `ApiError` and the HTTP status mapping
//! - [`extract`]: `ApiJson` / `ApiQuery`, rejecting bad input as `ApiError`
//! - [`middleware`]: per-request tracing span
//! - [`routes`]: handlers grouped by resource

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use haze_core::input::NewUser;
use haze_core::{ManagedUser, Role};
use haze_db::Database;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use auth::{AuthUser, JwtManager};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiQuery};
pub use routes::router;

/// Actor name recorded for changes the server makes on its own.
pub const SYSTEM_ACTOR: &str = "system";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);
        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `info,haze_api=debug`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,haze_api=debug")),
        )
        .with_target(true)
        .init();
}

/// Creates the configured admin account when the user table is empty.
///
/// Returns the new user, or `None` if any user already exists.
pub async fn bootstrap_admin(state: &AppState) -> ApiResult<Option<ManagedUser>> {
    if state.db.users().count().await? > 0 {
        return Ok(None);
    }

    let defaults = ServerConfig::default();
    if state.config.bootstrap_admin_password == defaults.bootstrap_admin_password {
        warn!("Bootstrap admin uses the default password, change it after first login");
    }

    let new = NewUser {
        name: "Administrator".to_string(),
        email: state.config.bootstrap_admin_email.clone(),
        phone: None,
        role: Role::Admin,
        password: state.config.bootstrap_admin_password.clone(),
    };
    new.validate()?;

    let hash = auth::hash_password(&new.password).await?;
    let user = state.db.users().create(&new, &hash, SYSTEM_ACTOR).await?;

    info!(email = %user.email, "Bootstrap admin created");
    Ok(Some(user))
}

#[cfg(test)]
pub(crate) mod test_support {
    use haze_core::input::NewProduct;
    use haze_core::ProductWithStock;
    use haze_db::DbConfig;

    use super::*;

    pub async fn state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::new(db, ServerConfig::default())
    }

    pub fn admin() -> AuthUser {
        AuthUser {
            id: "admin-1".to_string(),
            name: "Owner".to_string(),
            role: Role::Admin,
        }
    }

    pub fn staff() -> AuthUser {
        AuthUser {
            id: "staff-1".to_string(),
            name: "Rafi".to_string(),
            role: Role::Staff,
        }
    }

    /// Product costing 800 and selling at 1400, with `stock` units bought in cash.
    pub async fn product(state: &AppState, name: &str, stock: i64) -> ProductWithStock {
        let initial = (stock > 0).then(|| haze_core::input::NewBatch {
            date: None,
            quantity: stock,
            cost_price_cents: None,
            supplier: None,
            payment: None,
            note: None,
        });
        state
            .db
            .products()
            .create(
                &NewProduct {
                    name: name.to_string(),
                    category: "E-Liquid".to_string(),
                    cost_price_cents: 800,
                    selling_price_cents: 1400,
                    low_stock_threshold: None,
                    initial_stock: initial,
                },
                "Owner",
            )
            .await
            .unwrap()
    }
}
