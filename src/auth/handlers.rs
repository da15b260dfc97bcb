//! Authentication handlers

use axum::{
    extract::{Extension, Json},
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::extractors::AuthedUser;
use super::models::{
    CredentialsPayload, GithubCodePayload, GoogleIdTokenPayload, SessionResponse, SessionUser,
    SignInResponse,
};
use super::oauth::{self, ProviderIdentity};
use super::password::{hash_password, verify_password_async, PasswordParams};
use super::session::claims_expiry;
use crate::common::validation::normalize_email;
use crate::common::{safe_email_log, ApiError, ApiJson, AppState};
use crate::users::{repo, User};

/// Hash verified against when the email is unknown, so both paths cost one
/// argon2 verification
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash(params: &PasswordParams) -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| hash_password("dummy-password-for-timing", params).ok())
        .as_deref()
}

/// Issue a session for `user` and return it as body plus cookie
fn start_session(state: &AppState, user: &User) -> Result<Response, ApiError> {
    let session = state.sessions.issue(user)?;
    let cookie = state.sessions.session_cookie(&session);

    let body = SignInResponse {
        token: session.token,
        expires: session.expires,
        user: SessionUser::from(user),
    };

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(body)).into_response())
}

/// POST /api/auth/callback/credentials
/// Signs in with email and password
///
/// Unknown email, OAuth-only account and wrong password all answer with the
/// same 401 body.
///
/// # Request Body
/// ```json
/// { "email": "rahim@example.com", "password": "..." }
/// ```
///
/// # Response
/// ```json
/// { "token": "<jwt>", "expires": "...", "user": { ... } }
/// ```
pub async fn credentials_sign_in(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<CredentialsPayload>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::InvalidCredentials);
    }

    let user = repo::find_user_by_email(&state.db, &email).await?;

    let stored_hash = user.as_ref().and_then(|u| u.password_hash.clone());
    let verified = match stored_hash {
        Some(hash) => verify_password_async(payload.password, hash).await?,
        None => {
            if let Some(hash) = dummy_hash(&state.password_params) {
                let _ = verify_password_async(payload.password, hash.to_string()).await;
            }
            false
        }
    };

    let user = match (user, verified) {
        (Some(user), true) => user,
        _ => {
            warn!(email = %safe_email_log(&email), "Credential sign-in rejected");
            return Err(ApiError::InvalidCredentials);
        }
    };

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = "credentials",
        "User signed in"
    );
    start_session(&state, &user)
}

async fn federated_sign_in(state: &AppState, identity: ProviderIdentity) -> Result<Response, ApiError> {
    debug!(
        email = %safe_email_log(&identity.email),
        provider = identity.provider,
        provider_id = %identity.provider_account_id,
        "Provider identity confirmed, resolving local user"
    );

    let user = oauth::resolve_user(&state.db, &identity).await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = identity.provider,
        "User signed in"
    );
    start_session(state, &user)
}

/// POST /api/auth/callback/google
/// Signs in with a Google ID token obtained by the browser
///
/// # Request Body
/// ```json
/// { "idToken": "<google id token>" }
/// ```
pub async fn google_sign_in(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<GoogleIdTokenPayload>,
) -> Result<Response, ApiError> {
    if payload.id_token.trim().is_empty() {
        return Err(ApiError::invalid_field("idToken", "ID token is required"));
    }

    let identity = oauth::verify_google_id_token(&state.http, &state.oauth, payload.id_token.trim()).await?;
    federated_sign_in(&state, identity).await
}

/// POST /api/auth/callback/github
/// Signs in with a GitHub authorization code
///
/// # Request Body
/// ```json
/// { "code": "<authorization code>" }
/// ```
pub async fn github_sign_in(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<GithubCodePayload>,
) -> Result<Response, ApiError> {
    if payload.code.trim().is_empty() {
        return Err(ApiError::invalid_field("code", "Authorization code is required"));
    }

    let identity = oauth::github_identity(&state.http, &state.oauth, payload.code.trim()).await?;
    federated_sign_in(&state, identity).await
}

/// GET /api/auth/session
/// Current session, or `{}` when none is presented or it is invalid
pub async fn session(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    match state.sessions.validate_headers(&headers) {
        Some(claims) => {
            let body = SessionResponse {
                user: SessionUser::from(&claims),
                expires: claims_expiry(&claims),
            };
            Json(serde_json::to_value(body).unwrap_or_else(|_| json!({})))
        }
        None => Json(json!({})),
    }
}

/// POST /api/auth/signout
/// Clears the session cookie; bearer tokens are discarded client-side
pub async fn sign_out(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    debug!("Session cookie cleared");
    (
        AppendHeaders([(SET_COOKIE, state.sessions.clear_cookie())]),
        Json(json!({ "success": true })),
    )
}

/// GET /api/me
/// Returns the current authenticated user's information
///
/// # Response
/// ```json
/// { "user": { "id": "...", "name": "...", "email": "...", "emailVerified": true } }
/// ```
pub async fn me(authed: AuthedUser) -> Json<serde_json::Value> {
    Json(json!({ "user": SessionUser::from(&authed.user) }))
}
