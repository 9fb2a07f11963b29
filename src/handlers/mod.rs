pub mod admin;
pub mod api;
pub mod cart;
pub mod catalog;
pub mod extract;
pub mod groups;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod orders;

pub use admin::{create_admin_router, AdminState};
pub use api::{create_api_router, service_error_to_response, ApiError, ApiState};
pub use extract::{JsonBody, SUPERUSER_HEADER, USERNAME_HEADER, USER_ID_HEADER};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use middleware::{
    cors_layer, request_validation_middleware, security_headers_middleware, MAX_REQUEST_SIZE,
};

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::config::ServerConfig;
use crate::observability::observability_middleware;

/// Assemble the full application: operational endpoints, the public API and
/// the admin API behind the shared middleware stack
pub fn create_app(api_state: ApiState, admin_state: AdminState, server: &ServerConfig) -> Router {
    let metrics = api_state.metrics.clone();
    let metrics_for_middleware = metrics.clone();

    Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .merge(create_api_router(api_state))
        .merge(create_admin_router(admin_state))
        // Inner to outer; each layer wraps everything added before it
        .layer(axum_middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(RequestBodyLimitLayer::new(server.max_request_size))
        .layer(axum_middleware::from_fn(request_validation_middleware))
        .layer(cors_layer())
        .layer(axum_middleware::from_fn(security_headers_middleware))
}
