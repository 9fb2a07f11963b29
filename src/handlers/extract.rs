use axum::{
    extract::{rejection::JsonRejection, FromRef, FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::api::{error_body, service_error_to_response, ApiError};
use crate::models::{Caller, ServiceError};
use crate::services::GroupService;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USERNAME_HEADER: &str = "x-username";
pub const SUPERUSER_HEADER: &str = "x-user-superuser";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Identity forwarded by the authenticating proxy. Group memberships come
/// from the user store, never from the request.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    Arc<GroupService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                crate::warn_with_trace!("Request without a valid {} header", USER_ID_HEADER);
                service_error_to_response(ServiceError::Unauthenticated {
                    message: "Authentication credentials were not provided.".to_string(),
                })
            })?;

        let username = header(parts, USERNAME_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| format!("user{}", user_id));
        let is_superuser = header(parts, SUPERUSER_HEADER)
            .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
            .unwrap_or(false);

        let groups = Arc::<GroupService>::from_ref(state);
        groups
            .resolve_caller(user_id, &username, is_superuser)
            .await
            .map_err(service_error_to_response)
    }
}

/// `Json` with rejections rendered as the service's JSON error body.
/// Missing or mistyped fields are a 400.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                let status = match rejection {
                    JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    _ => StatusCode::BAD_REQUEST,
                };
                crate::warn_with_trace!("Rejected request body: {}", rejection.body_text());
                Err(error_body(status, rejection.body_text(), None))
            }
        }
    }
}
