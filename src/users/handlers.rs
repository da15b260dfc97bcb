//! Registration and user lookup handlers

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::models::{
    NewUser, PublicUser, RegisterRequest, RegisterResponse, UserLookupQuery, UserLookupResponse,
};
use super::repo;
use crate::auth::password::hash_password_async;
use crate::common::validation::{check_email, normalize_email};
use crate::common::{safe_email_log, ApiError, ApiJson, AppState, ValidationResult, Validator};

/// POST /api/register
/// Creates a credential account
///
/// # Request Body
/// ```json
/// { "name": "Rahim", "email": "rahim@example.com", "password": "at least 8" }
/// ```
///
/// # Response
/// `201 { "user": { "id": "...", "name": "...", "email": "..." } }`
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate().into_result()?;

    let email = normalize_email(&payload.email);

    // Cheap pre-check so duplicates skip the hash; the UNIQUE constraint
    // still decides races between concurrent registrations.
    if repo::find_user_by_email(&state.db, &email).await?.is_some() {
        debug!(email = %safe_email_log(&email), "Registration rejected: email already registered");
        return Err(ApiError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password_async(payload.password, state.password_params).await?;

    let user = repo::create_user(
        &state.db,
        NewUser {
            name: payload.name.trim().to_string(),
            email,
            password_hash: Some(password_hash),
            email_verified_at: None,
        },
    )
    .await?;

    info!(user_id = %user.id, email = %safe_email_log(&user.email), "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser::from(&user),
        }),
    ))
}

/// GET /api/user-lookup?email=
/// Returns the user id and verification status for an email
pub async fn user_lookup(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<UserLookupQuery>,
) -> Result<Json<UserLookupResponse>, ApiError> {
    let raw = query.email.unwrap_or_default();

    let mut validation = ValidationResult::new();
    check_email(&mut validation, "email", &raw);
    validation.into_result()?;

    let email = normalize_email(&raw);
    let user = repo::find_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserLookupResponse {
        user_id: user.id.clone(),
        is_verified: user.is_verified(),
    }))
}
