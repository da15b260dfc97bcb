//! Authentication data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::users::models::User;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Credential sign-in request
#[derive(Deserialize, Debug)]
pub struct CredentialsPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Google sign-in: an ID token obtained by the browser
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GoogleIdTokenPayload {
    #[serde(alias = "id_token")]
    pub id_token: String,
}

/// GitHub sign-in: the authorization code from the OAuth redirect
#[derive(Deserialize, Debug)]
pub struct GithubCodePayload {
    pub code: String,
}

/// User as exposed in a session
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified_at.is_some(),
        }
    }
}

impl From<&Claims> for SessionUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub.clone(),
            name: claims.name.clone(),
            email: claims.email.clone(),
            email_verified: claims.email_verified,
        }
    }
}

/// Response to a successful sign-in
#[derive(Serialize, Debug)]
pub struct SignInResponse {
    pub token: String,
    pub expires: DateTime<Utc>,
    pub user: SessionUser,
}

/// `GET /api/auth/session` body when a session is present
#[derive(Serialize, Debug)]
pub struct SessionResponse {
    pub user: SessionUser,
    pub expires: DateTime<Utc>,
}
