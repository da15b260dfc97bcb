//! Verification and password reset routes

use axum::{routing::post, Router};

use super::handlers;

/// # Routes
/// - `POST /api/send-verification` - Email a verification link
/// - `POST /api/verify-email` - Consume a verification token
/// - `POST /api/reset-password` - Email a password reset link
/// - `POST /api/reset-password/confirm` - Consume a reset token and set a new password
pub fn verification_routes() -> Router {
    Router::new()
        .route("/api/send-verification", post(handlers::send_verification))
        .route("/api/verify-email", post(handlers::verify_email))
        .route("/api/reset-password", post(handlers::reset_password))
        .route("/api/reset-password/confirm", post(handlers::confirm_reset))
}
