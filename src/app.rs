// src/app.rs
//! Router composition shared by the binary and the HTTP tests

use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::{auth_routes, route_guard};
use crate::common::AppState;
use crate::logging_middleware;
use crate::users::users_routes;
use crate::verification::verification_routes;

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}

/// Full application router
///
/// The route guard runs before routing, so it also covers pages served
/// from `frontend_dir`.
pub fn build_router(
    state: Arc<AppState>,
    cors_origins: &[String],
    frontend_dir: Option<&Path>,
) -> Router {
    let mut app = Router::new()
        .merge(auth_routes())
        .merge(users_routes())
        .merge(verification_routes())
        .route("/api/health", get(health));

    if let Some(dir) = frontend_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    app.layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(middleware::from_fn(route_guard))
        .layer(Extension(state))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}
