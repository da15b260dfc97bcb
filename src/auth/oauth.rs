//! Federated sign-in (Google, GitHub)
//!
//! The provider proves the identity; this module only checks the provider's
//! answer and maps it onto a local user, creating or linking one on first
//! sign-in.

use chrono::Utc;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::common::config::{env_opt, env_or};
use crate::common::validation::normalize_email;
use crate::common::{safe_email_log, ApiError};
use crate::users::models::{NewUser, User};
use crate::users::repo;

pub const GOOGLE: &str = "google";
pub const GITHUB: &str = "github";

const DEFAULT_GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const DEFAULT_GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "chat-auth-api";

#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl ProviderCredentials {
    /// Both variables must be set for the provider to be enabled
    fn from_env(id_var: &str, secret_var: &str) -> Option<Self> {
        Some(Self {
            client_id: env_opt(id_var)?,
            client_secret: env_opt(secret_var)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub google: Option<ProviderCredentials>,
    pub github: Option<ProviderCredentials>,
    pub google_tokeninfo_url: String,
    pub github_token_url: String,
    pub github_api_url: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            google: None,
            github: None,
            google_tokeninfo_url: DEFAULT_GOOGLE_TOKENINFO_URL.to_string(),
            github_token_url: DEFAULT_GITHUB_TOKEN_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

impl OAuthConfig {
    pub fn from_env() -> Self {
        let config = Self {
            google: ProviderCredentials::from_env("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            github: ProviderCredentials::from_env("GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET"),
            google_tokeninfo_url: env_or("GOOGLE_TOKENINFO_URL", DEFAULT_GOOGLE_TOKENINFO_URL),
            github_token_url: env_or("GITHUB_TOKEN_URL", DEFAULT_GITHUB_TOKEN_URL),
            github_api_url: env_or("GITHUB_API_URL", DEFAULT_GITHUB_API_URL),
        };
        info!(
            google = config.google.is_some(),
            github = config.github.is_some(),
            "OAuth providers configured"
        );
        config
    }
}

/// Identity asserted by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub provider: &'static str,
    pub provider_account_id: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
}

fn provider_disabled(provider: &str) -> ApiError {
    ApiError::NotFound(format!("Sign-in provider '{provider}' is not configured"))
}

fn upstream(provider: &str, e: impl std::fmt::Display) -> ApiError {
    error!(provider = %provider, error = %e, "OAuth provider request failed");
    ApiError::Upstream(format!("{provider} request failed: {e}"))
}

/// tokeninfo encodes booleans and numbers as strings
fn lenient_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn lenient_i64(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Validate a Google ID token with the tokeninfo endpoint
pub async fn verify_google_id_token(
    http: &Client,
    config: &OAuthConfig,
    id_token: &str,
) -> Result<ProviderIdentity, ApiError> {
    let credentials = config.google.as_ref().ok_or_else(|| provider_disabled(GOOGLE))?;

    let resp = http
        .get(&config.google_tokeninfo_url)
        .query(&[("id_token", id_token)])
        .send()
        .await
        .map_err(|e| upstream(GOOGLE, e))?;

    let status = resp.status();
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        warn!(http_status = %status, "Google rejected the id_token");
        return Err(ApiError::Unauthorized("invalid or expired id_token".to_string()));
    }
    if !status.is_success() {
        return Err(upstream(GOOGLE, format!("tokeninfo returned {status}")));
    }

    let body: Value = resp.json().await.map_err(|e| upstream(GOOGLE, e))?;

    match body.get("aud").and_then(Value::as_str) {
        Some(aud) if aud == credentials.client_id => {}
        Some(aud) => {
            warn!(token_audience = %aud, "Google token audience mismatch");
            return Err(ApiError::Unauthorized("token audience mismatch".to_string()));
        }
        None => return Err(ApiError::Unauthorized("token missing audience".to_string())),
    }

    if let Some(exp) = lenient_i64(body.get("exp")) {
        if exp < Utc::now().timestamp() {
            warn!(token_exp = exp, "Google token has expired");
            return Err(ApiError::Unauthorized("token has expired".to_string()));
        }
    }

    let (Some(sub), Some(email)) = (string_field(&body, "sub"), string_field(&body, "email")) else {
        warn!("Google token missing required fields (email/sub)");
        return Err(ApiError::Unauthorized("token missing required fields".to_string()));
    };

    Ok(ProviderIdentity {
        provider: GOOGLE,
        provider_account_id: sub,
        email,
        email_verified: lenient_bool(body.get("email_verified")),
        name: string_field(&body, "name"),
    })
}

#[derive(Deserialize)]
struct GithubTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    id: i64,
    login: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// Exchange a GitHub authorization code and read the user's identity
pub async fn github_identity(
    http: &Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<ProviderIdentity, ApiError> {
    let credentials = config.github.as_ref().ok_or_else(|| provider_disabled(GITHUB))?;

    let token: GithubTokenResponse = http
        .post(&config.github_token_url)
        .header(header::ACCEPT, "application/json")
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
        ])
        .send()
        .await
        .map_err(|e| upstream(GITHUB, e))?
        .json()
        .await
        .map_err(|e| upstream(GITHUB, e))?;

    let access_token = match (token.access_token, token.error) {
        (Some(t), _) if !t.is_empty() => t,
        (_, error) => {
            warn!(github_error = ?error, "GitHub rejected the authorization code");
            return Err(ApiError::Unauthorized("invalid authorization code".to_string()));
        }
    };

    let api = config.github_api_url.trim_end_matches('/');

    let user: GithubUser = github_get(http, &format!("{api}/user"), &access_token).await?;
    let emails: Vec<GithubEmail> =
        github_get(http, &format!("{api}/user/emails"), &access_token).await?;

    let email = emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.verified))
        .map(|e| e.email.clone())
        .ok_or_else(|| {
            warn!(github_login = %user.login, "GitHub account has no verified email");
            ApiError::Unauthorized("GitHub account has no verified email".to_string())
        })?;

    Ok(ProviderIdentity {
        provider: GITHUB,
        provider_account_id: user.id.to_string(),
        email,
        email_verified: true,
        name: user.name.or(Some(user.login)),
    })
}

async fn github_get<T: serde::de::DeserializeOwned>(
    http: &Client,
    url: &str,
    access_token: &str,
) -> Result<T, ApiError> {
    let resp = http
        .get(url)
        .bearer_auth(access_token)
        .header(header::ACCEPT, "application/vnd.github+json")
        .header(header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(|e| upstream(GITHUB, e))?;

    if resp.status() == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized("GitHub token rejected".to_string()));
    }
    if !resp.status().is_success() {
        return Err(upstream(GITHUB, format!("{url} returned {}", resp.status())));
    }

    resp.json().await.map_err(|e| upstream(GITHUB, e))
}

/// Display name for a new user: provider name, else the email's local part
fn display_name(identity: &ProviderIdentity) -> String {
    identity
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or("user")
                .to_string()
        })
}

/// Map a provider identity onto a local user
///
/// Known identity → its user. Otherwise an existing user with the same email
/// is linked only when the provider vouches for the address; a new user is
/// created when no user has the email.
pub async fn resolve_user(pool: &SqlitePool, identity: &ProviderIdentity) -> Result<User, ApiError> {
    if let Some(user) =
        repo::find_user_by_account(pool, identity.provider, &identity.provider_account_id).await?
    {
        debug!(user_id = %user.id, provider = identity.provider, "Existing linked account");
        return Ok(user);
    }

    let email = normalize_email(&identity.email);

    if let Some(user) = repo::find_user_by_email(pool, &email).await? {
        if !identity.email_verified {
            warn!(
                user_id = %user.id,
                provider = identity.provider,
                "Refusing to link provider account with unverified email"
            );
            return Err(ApiError::Conflict(
                "An account with this email already exists. Sign in with your password first."
                    .to_string(),
            ));
        }

        repo::link_account(pool, &user.id, identity.provider, &identity.provider_account_id)
            .await?;
        if !user.is_verified() {
            repo::mark_email_verified(pool, &user.id, Utc::now()).await?;
        }
        return repo::find_user_by_id(pool, &user.id)
            .await?
            .ok_or_else(|| ApiError::InternalServer("linked user disappeared".to_string()));
    }

    info!(
        email = %safe_email_log(&email),
        provider = identity.provider,
        "Creating new user account via OAuth"
    );

    let user = repo::create_user(
        pool,
        NewUser {
            name: display_name(identity),
            email,
            password_hash: None,
            email_verified_at: identity.email_verified.then(Utc::now),
        },
    )
    .await?;
    repo::link_account(pool, &user.id, identity.provider, &identity.provider_account_id).await?;

    Ok(user)
}
