use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use super::api::{error_body, ApiError};
use super::extract::{SUPERUSER_HEADER, USERNAME_HEADER, USER_ID_HEADER};

pub const MAX_REQUEST_SIZE: u64 = 1024 * 1024;

/// Reject oversized requests and non-JSON bodies before routing
pub async fn request_validation_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    validate_request_size(&request)?;
    validate_content_type(&request)?;
    Ok(next.run(request).await)
}

fn declared_length(request: &Request<Body>) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
}

/// Bodies, when present, must be JSON. Bodyless POSTs such as
/// `/orders/place/` pass through.
fn validate_content_type(request: &Request<Body>) -> Result<(), ApiError> {
    let with_body = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];
    if !with_body.contains(request.method()) {
        return Ok(());
    }

    match request.headers().get(header::CONTENT_TYPE) {
        Some(content_type) => {
            let content_type = content_type.to_str().unwrap_or("");
            if content_type.starts_with("application/json") {
                Ok(())
            } else {
                warn!("Invalid content type: {}", content_type);
                Err(error_body(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "Content-Type must be application/json".to_string(),
                    None,
                ))
            }
        }
        None if declared_length(request).unwrap_or(0) > 0 => {
            warn!("Request body without content type");
            Err(error_body(
                StatusCode::BAD_REQUEST,
                "Content-Type header is required for requests with body".to_string(),
                None,
            ))
        }
        None => Ok(()),
    }
}

fn validate_request_size(request: &Request<Body>) -> Result<(), ApiError> {
    match declared_length(request) {
        Some(length) if length > MAX_REQUEST_SIZE => {
            warn!("Request too large: {} bytes", length);
            Err(error_body(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!(
                    "Request size {} bytes exceeds maximum of {} bytes",
                    length, MAX_REQUEST_SIZE
                ),
                None,
            ))
        }
        _ => Ok(()),
    }
}

/// CORS for browser clients; the identity headers must be allowed through
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USERNAME_HEADER),
            HeaderName::from_static(SUPERUSER_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(86400))
}

pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'"),
    );

    response
}
