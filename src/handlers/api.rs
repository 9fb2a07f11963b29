use axum::{
    extract::FromRef,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{cart, catalog, groups, orders};
use crate::models::{RepositoryError, ServiceError, ServiceResult};
use crate::observability::Metrics;
use crate::services::{CartService, CatalogService, GroupService, OrderService};

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<Value>);

/// Shared application state containing all services
#[derive(Clone)]
pub struct ApiState {
    pub catalog_service: Arc<CatalogService>,
    pub cart_service: Arc<CartService>,
    pub order_service: Arc<OrderService>,
    pub group_service: Arc<GroupService>,
    pub metrics: Arc<Metrics>,
}

impl FromRef<ApiState> for Arc<GroupService> {
    fn from_ref(state: &ApiState) -> Self {
        state.group_service.clone()
    }
}

/// Business area a handler belongs to, for the operation counters
#[derive(Debug, Clone, Copy)]
pub(crate) enum Area {
    Catalog,
    Cart,
    Order,
    Group,
}

impl ApiState {
    /// Count the outcome of a service call, log failures and map them to a
    /// response
    pub(crate) fn finish<T>(
        &self,
        area: Area,
        operation: &str,
        result: ServiceResult<T>,
    ) -> Result<T, ApiError> {
        let success = result.is_ok();
        match area {
            Area::Catalog => self.metrics.record_catalog_operation(operation, success),
            Area::Cart => self.metrics.record_cart_operation(operation, success),
            Area::Order => self.metrics.record_order_operation(operation, success),
            Area::Group => self.metrics.record_group_operation(operation, success),
        }

        result.map_err(|err| {
            if let ServiceError::Forbidden { .. } = err {
                self.metrics.record_access_denied(operation);
            }
            let response = service_error_to_response(err);
            if response.0.is_server_error() {
                crate::error_with_trace!(operation = operation, status = %response.0, "Request failed");
            } else {
                crate::warn_with_trace!(operation = operation, status = %response.0, "Request rejected");
            }
            response
        })
    }
}

/// Create API router with all endpoints
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        // Group administration
        .route("/add_user_to_group/", post(groups::add_user_to_group))
        .route("/remove_user_from_group/", post(groups::remove_user_from_group))
        // Catalog
        .route(
            "/menu_items/",
            get(catalog::list_menu_items)
                .post(catalog::create_menu_item)
                .put(catalog::update_menu_item)
                .delete(catalog::delete_menu_item),
        )
        .route(
            "/categories/",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/:id/",
            get(catalog::get_category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
        // Cart
        .route("/cart/", get(cart::view_cart))
        .route("/cart/add/", post(cart::add_to_cart))
        .route("/cart/flush/", post(cart::flush_cart))
        // Orders
        .route("/orders/", get(orders::browse_orders))
        .route("/orders/place/", post(orders::place_order))
        .route(
            "/orders/mark_as_delivered/:order_id/",
            post(orders::mark_as_delivered),
        )
        .route(
            "/order-items/",
            get(orders::list_order_items).post(orders::create_order_item),
        )
        .route(
            "/order-items/:id/",
            get(orders::get_order_item)
                .put(orders::update_order_item)
                .delete(orders::delete_order_item),
        )
        .with_state(state)
}

/// JSON error body with an optional offending field
pub(crate) fn error_body(status: StatusCode, message: String, field: Option<String>) -> ApiError {
    let mut body = json!({
        "error": message,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if let Some(field) = field {
        body["field"] = Value::String(field);
    }
    (status, Json(body))
}

/// Convert ServiceError to HTTP response
pub fn service_error_to_response(err: ServiceError) -> ApiError {
    match err {
        ServiceError::CategoryNotFound { .. }
        | ServiceError::MenuItemNotFound { .. }
        | ServiceError::OrderNotFound { .. }
        | ServiceError::OrderItemNotFound { .. }
        | ServiceError::UserNotFound { .. }
        | ServiceError::GroupNotFound { .. } => {
            error_body(StatusCode::NOT_FOUND, err.to_string(), None)
        }
        ServiceError::Forbidden { message } => error_body(StatusCode::FORBIDDEN, message, None),
        ServiceError::Unauthenticated { message } => {
            error_body(StatusCode::UNAUTHORIZED, message, None)
        }
        ServiceError::ValidationError { field, message } => {
            error_body(StatusCode::BAD_REQUEST, message, Some(field))
        }
        ServiceError::InvalidState { message } => {
            error_body(StatusCode::BAD_REQUEST, message, None)
        }
        ServiceError::Repository { source } => match source {
            RepositoryError::NotFound => {
                error_body(StatusCode::NOT_FOUND, "Resource not found".to_string(), None)
            }
            RepositoryError::ConstraintViolation { field, message } => {
                error_body(StatusCode::BAD_REQUEST, message, Some(field))
            }
            RepositoryError::TransactionFailed { .. } => error_body(
                StatusCode::CONFLICT,
                "The data changed while the request was processed; retry".to_string(),
                None,
            ),
            RepositoryError::ConnectionFailed | RepositoryError::RateLimitExceeded => error_body(
                StatusCode::SERVICE_UNAVAILABLE,
                "Database unavailable".to_string(),
                None,
            ),
            RepositoryError::Timeout => error_body(
                StatusCode::GATEWAY_TIMEOUT,
                "Database timeout".to_string(),
                None,
            ),
            _ => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let (status, Json(body)) =
            service_error_to_response(ServiceError::OrderNotFound { id: 3 });
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Order not found: 3");
        assert!(body.get("field").is_none());
    }

    #[test]
    fn test_validation_mapping_includes_field() {
        let (status, Json(body)) = service_error_to_response(ServiceError::ValidationError {
            field: "price".to_string(),
            message: "bad price".to_string(),
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "price");
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn test_role_errors_mapping() {
        let (status, Json(body)) = service_error_to_response(ServiceError::forbidden("Not authorized"));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Not authorized");

        let (status, _) = service_error_to_response(ServiceError::Unauthenticated {
            message: "no identity".to_string(),
        });
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_repository_mapping() {
        let (status, Json(body)) = service_error_to_response(
            RepositoryError::ConstraintViolation {
                field: "slug".to_string(),
                message: "slug already exists".to_string(),
            }
            .into(),
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "slug");

        let (status, _) = service_error_to_response(
            RepositoryError::TransactionFailed {
                message: "cancelled".to_string(),
            }
            .into(),
        );
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, Json(body)) = service_error_to_response(
            RepositoryError::AwsSdk {
                message: "secret detail".to_string(),
            }
            .into(),
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
