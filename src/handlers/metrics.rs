use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::api::error_body;
use crate::observability::Metrics;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// HTTP, per-area business and access-denied series in Prometheus text form.
/// Encoding failures use the same JSON error body as the API.
#[instrument(name = "metrics_handler", skip(metrics))]
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    let metrics_text = match metrics.encode() {
        Ok(metrics_text) => metrics_text,
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            return error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
                None,
            )
            .into_response();
        }
    };

    debug!(bytes = metrics_text.len(), "Serving metrics");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        metrics_text,
    )
        .into_response()
}
