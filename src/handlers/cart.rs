use axum::{extract::State, http::StatusCode, response::Json};
use tracing::instrument;

use super::api::{ApiError, ApiState, Area};
use super::extract::JsonBody;
use crate::models::{AddToCartRequest, Caller, CartLine, CartResponse};

/// The caller's cart with totals
#[instrument(name = "view_cart", skip(state, caller), fields(user_id = caller.user_id))]
pub async fn view_cart(
    State(state): State<ApiState>,
    caller: Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let result = state.cart_service.view_cart(&caller).await;
    state.finish(Area::Cart, "view_cart", result).map(Json)
}

/// Add or replace the caller's row for a menu item
#[instrument(name = "add_to_cart", skip(state, caller, request), fields(
    user_id = caller.user_id,
    menuitem_id = request.menuitem_id,
    quantity = request.quantity,
))]
pub async fn add_to_cart(
    State(state): State<ApiState>,
    caller: Caller,
    JsonBody(request): JsonBody<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartLine>), ApiError> {
    let result = state.cart_service.add_to_cart(&caller, request).await;
    let line = state.finish(Area::Cart, "add_to_cart", result)?;
    Ok((StatusCode::CREATED, Json(line)))
}

#[instrument(name = "flush_cart", skip(state, caller), fields(user_id = caller.user_id))]
pub async fn flush_cart(
    State(state): State<ApiState>,
    caller: Caller,
) -> Result<StatusCode, ApiError> {
    let result = state.cart_service.flush_cart(&caller).await;
    state.finish(Area::Cart, "flush_cart", result)?;
    Ok(StatusCode::NO_CONTENT)
}
