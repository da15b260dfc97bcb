// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::guard::GuardConfig;
use crate::auth::oauth::OAuthConfig;
use crate::auth::password::PasswordParams;
use crate::auth::session::SessionIssuer;
use crate::services::email::EmailSender;

/// Immutable per-process state; handlers receive it as `Extension<Arc<AppState>>`
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub http: Client,
    pub app_url: String,
    pub sessions: SessionIssuer,
    pub password_params: PasswordParams,
    pub oauth: OAuthConfig,
    pub guard: GuardConfig,
    pub mailer: Arc<dyn EmailSender>,
}

impl AppState {
    /// Absolute link into the web app carrying a bearer token in the query
    pub fn token_link(&self, path: &str, token: &str) -> String {
        format!(
            "{}{}?token={}",
            self.app_url,
            path,
            urlencoding::encode(token)
        )
    }
}
