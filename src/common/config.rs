// src/common/config.rs
//! Environment configuration
//!
//! Every recognized variable is read once at startup. Subsystems own their
//! own `from_env` constructors; `AppConfig::from_env` composes them.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::auth::guard::GuardConfig;
use crate::auth::oauth::OAuthConfig;
use crate::auth::password::PasswordParams;
use crate::auth::session::SessionConfig;
use crate::services::email::EmailTransport;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Non-empty value of an environment variable
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Parses an environment variable, falling back to `default` when it is
/// unset or malformed
pub fn env_parse<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = key, value = %raw, default = ?default, "Ignoring malformed environment value");
                default
            }
        },
        None => default,
    }
}

pub fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Comma-separated list, trimmed, empty entries dropped
pub fn env_list(key: &str) -> Option<Vec<String>> {
    env_opt(key).map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// `TOKEN_SWEEP_INTERVAL_SECS`, which must be a positive whole number
fn sweep_interval(raw: Option<String>) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var: "TOKEN_SWEEP_INTERVAL_SECS",
            reason: "must be at least 1 second".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(ConfigError::Invalid {
            var: "TOKEN_SWEEP_INTERVAL_SECS",
            reason: format!("'{raw}' is not a number of seconds"),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub reset_db: bool,
    pub port: u16,
    /// Public origin of the web app, used to build links in emails
    pub app_url: String,
    pub cors_origins: Vec<String>,
    pub frontend_dir: Option<PathBuf>,
    pub token_sweep_interval: Duration,
    pub session: SessionConfig,
    pub password: PasswordParams,
    pub oauth: OAuthConfig,
    pub guard: GuardConfig,
    pub email: EmailTransport,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_url = env_or("APP_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();

        let session = SessionConfig::from_env(app_url.starts_with("https://"))?;

        Ok(Self {
            database_url: env_or("DATABASE_URL", "sqlite://chat_auth.db"),
            reset_db: env_bool("RESET_DB", false),
            port: env_parse("PORT", 8080u16),
            cors_origins: env_list("CORS_ORIGINS").unwrap_or_else(|| vec![app_url.clone()]),
            app_url,
            frontend_dir: env_opt("FRONTEND_DIR").map(PathBuf::from),
            token_sweep_interval: sweep_interval(env_opt("TOKEN_SWEEP_INTERVAL_SECS"))?,
            session,
            password: PasswordParams::from_env(),
            oauth: OAuthConfig::from_env(),
            guard: GuardConfig::from_env(),
            email: EmailTransport::from_env()?,
        })
    }
}
