//! Route guard
//!
//! Evaluated for every request before routing:
//! - protected page without a valid session → sign-in, with the original
//!   path and query as `callbackUrl`
//! - sign-in / sign-up page with a valid session → landing page
//! - anything else passes through untouched
//!
//! Session validity comes only from `SessionIssuer::validate`.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::common::config::{env_list, env_opt};
use crate::common::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub protected_prefixes: Vec<String>,
    pub auth_pages: Vec<String>,
    pub sign_in_path: String,
    pub landing_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: ["/chat", "/dashboard", "/profile", "/settings"]
                .into_iter()
                .map(String::from)
                .collect(),
            auth_pages: vec!["/sign-in".to_string(), "/sign-up".to_string()],
            sign_in_path: "/sign-in".to_string(),
            landing_path: "/chat".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    Redirect(String),
}

/// `path` equals `prefix` or continues it with a new segment
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Percent-encode a path (and query) for use as a query value, keeping `/`
fn encode_callback(path_and_query: &str) -> String {
    path_and_query
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl GuardConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            protected_prefixes: env_list("GUARD_PROTECTED_PREFIXES")
                .unwrap_or(defaults.protected_prefixes),
            auth_pages: env_list("GUARD_AUTH_PAGES").unwrap_or(defaults.auth_pages),
            sign_in_path: env_opt("GUARD_SIGN_IN_PATH").unwrap_or(defaults.sign_in_path),
            landing_path: env_opt("GUARD_LANDING_PATH").unwrap_or(defaults.landing_path),
        }
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| matches_prefix(path, prefix))
    }

    pub fn is_auth_page(&self, path: &str) -> bool {
        self.auth_pages.iter().any(|page| matches_prefix(path, page))
    }

    pub fn decide(&self, path: &str, query: Option<&str>, has_session: bool) -> GuardDecision {
        // Auth pages are never protected, or sign-in would redirect to itself
        if !has_session && self.is_protected(path) && !self.is_auth_page(path) {
            let original = match query {
                Some(q) if !q.is_empty() => format!("{path}?{q}"),
                _ => path.to_string(),
            };
            return GuardDecision::Redirect(format!(
                "{}?callbackUrl={}",
                self.sign_in_path,
                encode_callback(&original)
            ));
        }

        if has_session && self.is_auth_page(path) {
            return GuardDecision::Redirect(self.landing_path.clone());
        }

        GuardDecision::Pass
    }
}

/// Middleware applying `GuardConfig::decide` to each request
pub async fn route_guard(
    Extension(state): Extension<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // Only paths the guard cares about pay for signature verification
    if !state.guard.is_protected(&path) && !state.guard.is_auth_page(&path) {
        return next.run(request).await;
    }

    let has_session = state.sessions.validate_headers(request.headers()).is_some();

    match state.guard.decide(&path, request.uri().query(), has_session) {
        GuardDecision::Pass => next.run(request).await,
        GuardDecision::Redirect(location) => {
            debug!(path = %path, location = %location, has_session, "Route guard redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_without_session_redirects_with_callback() {
        let guard = GuardConfig::default();
        assert_eq!(
            guard.decide("/chat", None, false),
            GuardDecision::Redirect("/sign-in?callbackUrl=/chat".to_string())
        );
        assert_eq!(
            guard.decide("/dashboard/usage", None, false),
            GuardDecision::Redirect("/sign-in?callbackUrl=/dashboard/usage".to_string())
        );
    }

    #[test]
    fn test_callback_preserves_query() {
        let guard = GuardConfig::default();
        assert_eq!(
            guard.decide("/chat", Some("lang=bn&id=7"), false),
            GuardDecision::Redirect("/sign-in?callbackUrl=/chat%3Flang%3Dbn%26id%3D7".to_string())
        );
    }

    #[test]
    fn test_protected_with_session_passes() {
        let guard = GuardConfig::default();
        assert_eq!(guard.decide("/chat", None, true), GuardDecision::Pass);
    }

    #[test]
    fn test_auth_pages_with_session_go_to_landing() {
        let guard = GuardConfig::default();
        assert_eq!(
            guard.decide("/sign-in", None, true),
            GuardDecision::Redirect("/chat".to_string())
        );
        assert_eq!(
            guard.decide("/sign-up", None, true),
            GuardDecision::Redirect("/chat".to_string())
        );
        assert_eq!(guard.decide("/sign-in", None, false), GuardDecision::Pass);
    }

    #[test]
    fn test_public_paths_pass() {
        let guard = GuardConfig::default();
        for path in ["/", "/about", "/api/register", "/verify-email"] {
            assert_eq!(guard.decide(path, None, false), GuardDecision::Pass);
            assert_eq!(guard.decide(path, None, true), GuardDecision::Pass);
        }
    }

    #[test]
    fn test_prefix_match_is_segment_aware() {
        let guard = GuardConfig::default();
        assert!(guard.is_protected("/chat"));
        assert!(guard.is_protected("/chat/"));
        assert!(guard.is_protected("/chat/123"));
        assert!(!guard.is_protected("/chatter"));
        assert!(!guard.is_auth_page("/sign-inside"));
    }

    #[test]
    fn test_custom_prefix_with_trailing_slash() {
        let guard = GuardConfig {
            protected_prefixes: vec!["/billing/".to_string()],
            ..GuardConfig::default()
        };
        assert!(guard.is_protected("/billing"));
        assert!(!guard.is_protected("/chat"));
    }

    #[test]
    fn test_root_prefix_never_loops_on_sign_in() {
        let guard = GuardConfig {
            protected_prefixes: vec!["/".to_string()],
            ..GuardConfig::default()
        };
        assert_eq!(guard.decide("/sign-in", None, false), GuardDecision::Pass);
        assert!(matches!(
            guard.decide("/anything", None, false),
            GuardDecision::Redirect(_)
        ));
    }
}
