//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::Claims;
use super::session::extract_session_token;
use crate::common::{safe_email_log, ApiError, AppState};
use crate::users::{repo, User};

/// Authenticated user extractor
///
/// Validates the session token (bearer header or cookie) and loads the user
/// it names. A valid token for a deleted user is rejected.
#[derive(Debug)]
pub struct AuthedUser {
    pub user: User,
    pub claims: Claims,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let cookie_name = &app_state.sessions.config().cookie_name;
        let Some(token) = extract_session_token(&parts.headers, cookie_name) else {
            debug!("Authentication failed: no session token");
            return Err(ApiError::Unauthorized("missing session".into()));
        };

        let claims = app_state.sessions.validate(&token)?;

        match repo::find_user_by_id(&app_state.db, &claims.sub).await? {
            Some(user) => {
                debug!(
                    user_id = %user.id,
                    email = %safe_email_log(&user.email),
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser { user, claims })
            }
            None => {
                warn!(user_id = %claims.sub, "Authentication failed: user not found in database");
                Err(ApiError::Unauthorized("user not found".into()))
            }
        }
    }
}
