//! User routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// # Routes
/// - `POST /api/register` - Credential registration
/// - `GET /api/user-lookup?email=` - User id and verification status
pub fn users_routes() -> Router {
    Router::new()
        .route("/api/register", post(handlers::register))
        .route("/api/user-lookup", get(handlers::user_lookup))
}
