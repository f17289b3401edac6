// ============================
// jokes-backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::auth::{current_user, login_action, login_page, logout_action};
use crate::AppState;

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login_page).post(login_action))
        .route("/logout", post(logout_action))
        .route("/me", get(current_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
