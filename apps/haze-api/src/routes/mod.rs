//! HTTP routes, one module per resource.
//!
//! ```text
//!   /health                         health
//!   /api/auth/*                     auth
//!   /api/products/*                 products
//!   /api/sales/*                    sales
//!   /api/expenses/*                 expenses
//!   /api/accounts/*                 accounts   (admin)
//!   /api/capital                    capital    (admin)
//!   /api/users/*                    users      (admin)
//!   /api/logs                       logs       (admin)
//! ```
//!
//! Role checks live in the handlers (`user.require_admin()?`), so each
//! endpoint's access rule reads next to its logic.

pub mod accounts;
pub mod auth;
pub mod capital;
pub mod expenses;
pub mod health;
pub mod logs;
pub mod products;
pub mod sales;
pub mod users;

use axum::Router;

use crate::middleware::request_tracing_middleware;
use crate::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(products::routes())
        .merge(sales::routes())
        .merge(expenses::routes())
        .merge(accounts::routes())
        .merge(capital::routes())
        .merge(users::routes())
        .merge(logs::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            request_tracing_middleware,
        ))
        .with_state(state)
}
