//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/callback/credentials` - Email and password sign-in
/// - `POST /api/auth/callback/google` - Google ID token sign-in
/// - `POST /api/auth/callback/github` - GitHub authorization code sign-in
/// - `GET /api/auth/session` - Current session or `{}`
/// - `POST /api/auth/signout` - Clear the session cookie
/// - `GET /api/me` - Get current user information
pub fn auth_routes() -> Router {
    Router::new()
        .route(
            "/api/auth/callback/credentials",
            post(handlers::credentials_sign_in),
        )
        .route("/api/auth/callback/google", post(handlers::google_sign_in))
        .route("/api/auth/callback/github", post(handlers::github_sign_in))
        .route("/api/auth/session", get(handlers::session))
        .route("/api/auth/signout", post(handlers::sign_out))
        .route("/api/me", get(handlers::me))
}
