//! Email verification and password reset handlers

use axum::extract::{Extension, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::models::{
    ConfirmResetRequest, ResetPasswordRequest, SendVerificationRequest, SuccessResponse,
    TokenPurpose, VerifyEmailRequest,
};
use super::service::{consume_token, issue_token};
use crate::auth::password::hash_password_async;
use crate::common::validation::{check_email, check_password, normalize_email};
use crate::common::{safe_email_log, ApiError, ApiJson, AppState, ValidationResult};
use crate::services::email::{password_reset_email, verification_email};
use crate::users::{repo, User};

/// Same body whether or not the address belongs to an account
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent.";

pub const ALREADY_VERIFIED_MESSAGE: &str = "Email is already verified";

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

fn require_token(token: &str) -> Result<(), ApiError> {
    if token.trim().is_empty() {
        return Err(ApiError::invalid_field("token", "Token is required"));
    }
    Ok(())
}

/// POST /api/send-verification
/// Issues a verification token for a user and emails the link
///
/// # Request Body
/// ```json
/// { "userId": "U_...", "email": "rahim@example.com" }
/// ```
pub async fn send_verification(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<SendVerificationRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let mut validation = ValidationResult::new();
    if payload.user_id.trim().is_empty() {
        validation.add_error("userId", "User id is required");
    }
    check_email(&mut validation, "email", &payload.email);
    validation.into_result()?;

    let email = normalize_email(&payload.email);
    let user = repo::find_user_by_id(&state.db, payload.user_id.trim())
        .await?
        .ok_or_else(user_not_found)?;

    // The token is only ever mailed to the address on record
    if user.email != email {
        debug!(user_id = %user.id, "Verification requested for an address the user does not own");
        return Err(user_not_found());
    }

    if user.is_verified() {
        return Ok(Json(SuccessResponse::with_message(ALREADY_VERIFIED_MESSAGE)));
    }

    send_verification_email(&state, &user).await?;

    Ok(Json(SuccessResponse::ok()))
}

/// Issue a verification token for `user` and deliver the link
pub async fn send_verification_email(state: &AppState, user: &User) -> Result<(), ApiError> {
    let token = issue_token(&state.db, &user.email, TokenPurpose::EmailVerification).await?;
    let link = state.token_link("/verify-email", &token.token);

    state
        .mailer
        .send(verification_email(&user.email, &user.name, &link))
        .await?;

    info!(user_id = %user.id, email = %safe_email_log(&user.email), "Verification email sent");
    Ok(())
}

/// POST /api/verify-email
/// Consumes a verification token and marks the address verified
pub async fn verify_email(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<VerifyEmailRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_token(&payload.token)?;

    let consumed = consume_token(
        &state.db,
        payload.token.trim(),
        TokenPurpose::EmailVerification,
    )
    .await?;

    let user = repo::find_user_by_email(&state.db, &consumed.identifier)
        .await?
        .ok_or_else(user_not_found)?;

    repo::mark_email_verified(&state.db, &user.id, Utc::now()).await?;

    info!(user_id = %user.id, email = %safe_email_log(&user.email), "Email verified");
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/reset-password
/// Requests a password reset link
///
/// Always answers with the same body so the response never reveals whether
/// the address is registered. Delivery problems are logged only.
pub async fn reset_password(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let mut validation = ValidationResult::new();
    check_email(&mut validation, "email", &payload.email);
    validation.into_result()?;

    let email = normalize_email(&payload.email);

    match repo::find_user_by_email(&state.db, &email).await? {
        Some(user) => {
            if let Err(e) = send_reset_email(&state, &user).await {
                error!(error = %e, user_id = %user.id, "Failed to deliver password reset email");
            }
        }
        None => {
            debug!(email = %safe_email_log(&email), "Password reset requested for unknown email");
        }
    }

    Ok(Json(SuccessResponse::with_message(RESET_REQUESTED_MESSAGE)))
}

async fn send_reset_email(state: &AppState, user: &User) -> Result<(), ApiError> {
    let token = issue_token(&state.db, &user.email, TokenPurpose::PasswordReset).await?;
    let link = state.token_link("/reset-password", &token.token);

    state
        .mailer
        .send(password_reset_email(&user.email, &link))
        .await?;

    info!(user_id = %user.id, "Password reset email sent");
    Ok(())
}

/// POST /api/reset-password/confirm
/// Consumes a reset token and sets a new password
///
/// # Request Body
/// ```json
/// { "token": "...", "password": "new password" }
/// ```
pub async fn confirm_reset(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<ConfirmResetRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    // Validate before consuming so a rejected password does not burn the token
    let mut validation = ValidationResult::new();
    if payload.token.trim().is_empty() {
        validation.add_error("token", "Token is required");
    }
    check_password(&mut validation, "password", &payload.password);
    validation.into_result()?;

    let consumed = consume_token(&state.db, payload.token.trim(), TokenPurpose::PasswordReset).await?;

    let user = repo::find_user_by_email(&state.db, &consumed.identifier)
        .await?
        .ok_or_else(user_not_found)?;

    let password_hash = hash_password_async(payload.password, state.password_params).await?;
    repo::update_password_hash(&state.db, &user.id, &password_hash).await?;

    info!(user_id = %user.id, "Password reset completed");
    Ok(Json(SuccessResponse::with_message("Password has been reset")))
}
