// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, clients};
use crate::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/validate", post(auth::validate))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/logout-all", post(auth::logout_all))
        .route("/api/clients/register", post(clients::register))
        .route("/api/clients/rotate-key", post(clients::rotate_key))
        .route("/health", get(clients::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
