//! Session issuer
//!
//! A session is an HS256 JWT signed with `AUTH_SECRET`. It reaches the server
//! either as `Authorization: Bearer <jwt>` or as the session cookie. Nothing
//! in the token is trusted before the signature and expiry are checked.

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

use super::models::Claims;
use crate::common::config::{env_opt, env_or, env_parse, ConfigError};
use crate::users::models::User;

/// Default session lifetime (30 days)
pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

pub const DEFAULT_COOKIE_NAME: &str = "session-token";

/// Shortest secret accepted for HS256 signing
const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    Invalid(String),

    #[error("failed to sign session token: {0}")]
    Signing(String),
}

#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub max_age: Duration,
    pub cookie_name: String,
    /// Adds `Secure` to the cookie; set when the app is served over https
    pub secure_cookie: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"[REDACTED]")
            .field("max_age", &self.max_age)
            .field("cookie_name", &self.cookie_name)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

impl SessionConfig {
    pub fn from_env(secure_cookie: bool) -> Result<Self, ConfigError> {
        let secret = env_opt("AUTH_SECRET").ok_or(ConfigError::Missing("AUTH_SECRET"))?;
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid {
                var: "AUTH_SECRET",
                reason: format!("must be at least {MIN_SECRET_LENGTH} characters"),
            });
        }

        Ok(Self {
            secret,
            max_age: Duration::seconds(env_parse(
                "SESSION_MAX_AGE_SECS",
                DEFAULT_SESSION_MAX_AGE_SECS,
            )),
            cookie_name: env_or("SESSION_COOKIE_NAME", DEFAULT_COOKIE_NAME),
            secure_cookie,
        })
    }
}

/// A freshly minted session
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Mints and validates session tokens
#[derive(Clone)]
pub struct SessionIssuer {
    config: Arc<SessionConfig>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionIssuer {
    pub fn new(config: SessionConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config: Arc::new(config),
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Issue a session scoped to `user.id`
    pub fn issue(&self, user: &User) -> Result<SessionToken, SessionError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<SessionToken, SessionError> {
        let expires = now + self.config.max_age;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            email_verified: user.email_verified_at.is_some(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing(e.to_string()))?;

        Ok(SessionToken { token, expires })
    }

    /// Verify signature and expiry, returning the claims
    pub fn validate(&self, token: &str) -> Result<Claims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| SessionError::Invalid(e.to_string()))
    }

    /// Claims of the session presented with a request, if any and valid
    pub fn validate_headers(&self, headers: &HeaderMap) -> Option<Claims> {
        let token = extract_session_token(headers, &self.config.cookie_name)?;
        self.validate(&token).ok()
    }

    /// `Set-Cookie` value storing a session
    pub fn session_cookie(&self, session: &SessionToken) -> String {
        let max_age = (session.expires - Utc::now()).num_seconds().max(0);
        self.cookie(&session.token, max_age)
    }

    /// `Set-Cookie` value removing the session cookie
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.config.cookie_name, value, max_age
        );
        if self.config.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Expiry of validated claims as a timestamp
pub fn claims_expiry(claims: &Claims) -> DateTime<Utc> {
    Utc.timestamp_opt(claims.exp, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Session token from the Authorization header, falling back to the cookie
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
pub(crate) fn test_issuer() -> SessionIssuer {
    SessionIssuer::new(SessionConfig {
        secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
        max_age: Duration::hours(1),
        cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        secure_cookie: false,
    })
}
