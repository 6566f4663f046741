//! Route definitions for the Mutuelle API

mod auth;
mod loan;
mod loan_request;
mod member;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::handlers;
use crate::middleware;
use crate::state::AppState;

pub use auth::auth_routes;
pub use loan::loan_routes;
pub use loan_request::loan_request_routes;
pub use member::member_routes;

/// The complete application: every route plus the middleware stack
pub fn app_router(state: AppState, config: &Config) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .merge(member_routes())
        .merge(loan_request_routes())
        .merge(loan_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers));

    if config.environment.is_production() {
        app = app.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    app.layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()))
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default();

    if allowed_origins.trim().is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
