use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::instrument;

use super::api::{service_error_to_response, ApiError, ApiState, Area};
use super::extract::JsonBody;
use crate::models::{
    parse_status_flag, Caller, Order, OrderDetail, OrderItem, OrderItemRequest,
};

/// Query parameters for listing orders
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    /// Delivered flag; honoured for managers only
    pub status: Option<String>,
}

#[instrument(name = "browse_orders", skip(state, caller), fields(user_id = caller.user_id))]
pub async fn browse_orders(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(parse_status_flag)
        .transpose()
        .map_err(|err| service_error_to_response(err.into()))?;

    let result = state.order_service.browse_orders(&caller, status).await;
    state.finish(Area::Order, "browse_orders", result).map(Json)
}

#[instrument(name = "place_order", skip(state, caller), fields(user_id = caller.user_id))]
pub async fn place_order(
    State(state): State<ApiState>,
    caller: Caller,
) -> Result<(StatusCode, Json<OrderDetail>), ApiError> {
    let result = state.order_service.place_order(&caller).await;
    let detail = state.finish(Area::Order, "place_order", result)?;
    crate::info_with_trace!(order_id = detail.order.id, "Order placed");
    Ok((StatusCode::CREATED, Json(detail)))
}

#[instrument(name = "mark_as_delivered", skip(state, caller), fields(user_id = caller.user_id))]
pub async fn mark_as_delivered(
    State(state): State<ApiState>,
    caller: Caller,
    Path(order_id): Path<u64>,
) -> Result<Json<Order>, ApiError> {
    let result = state.order_service.mark_delivered(&caller, order_id).await;
    state
        .finish(Area::Order, "mark_as_delivered", result)
        .map(Json)
}

// =============================================================================
// ORDER ITEMS
// =============================================================================

#[instrument(name = "list_order_items", skip(state, _caller))]
pub async fn list_order_items(
    State(state): State<ApiState>,
    _caller: Caller,
) -> Result<Json<Vec<OrderItem>>, ApiError> {
    let result = state.order_service.list_order_items().await;
    state
        .finish(Area::Order, "list_order_items", result)
        .map(Json)
}

#[instrument(name = "create_order_item", skip(state, caller, request), fields(user_id = caller.user_id, order_id = request.order_id))]
pub async fn create_order_item(
    State(state): State<ApiState>,
    caller: Caller,
    JsonBody(request): JsonBody<OrderItemRequest>,
) -> Result<(StatusCode, Json<OrderItem>), ApiError> {
    let result = state.order_service.create_order_item(&caller, request).await;
    let item = state.finish(Area::Order, "create_order_item", result)?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(name = "get_order_item", skip(state, _caller), fields(order_item_id = id))]
pub async fn get_order_item(
    State(state): State<ApiState>,
    _caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<OrderItem>, ApiError> {
    let result = state.order_service.get_order_item(id).await;
    state.finish(Area::Order, "get_order_item", result).map(Json)
}

#[instrument(name = "update_order_item", skip(state, caller, request), fields(user_id = caller.user_id, order_item_id = id))]
pub async fn update_order_item(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<u64>,
    JsonBody(request): JsonBody<OrderItemRequest>,
) -> Result<Json<OrderItem>, ApiError> {
    let result = state
        .order_service
        .update_order_item(&caller, id, request)
        .await;
    state
        .finish(Area::Order, "update_order_item", result)
        .map(Json)
}

#[instrument(name = "delete_order_item", skip(state, caller), fields(user_id = caller.user_id, order_item_id = id))]
pub async fn delete_order_item(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let result = state.order_service.delete_order_item(&caller, id).await;
    state.finish(Area::Order, "delete_order_item", result)?;
    Ok(StatusCode::NO_CONTENT)
}
