use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::instrument;

use super::api::{service_error_to_response, ApiError, ApiState, Area};
use super::extract::JsonBody;
use crate::models::{
    Caller, Category, CategoryRequest, DeleteMenuItemRequest, MenuItem, MenuItemFilters,
    MenuItemRequest, UpdateMenuItemRequest, ValidationError,
};

/// Query parameters for listing menu items
#[derive(Debug, Default, Deserialize)]
pub struct MenuItemsQuery {
    /// Category slug
    pub category: Option<String>,
    pub price: Option<String>,
}

impl MenuItemsQuery {
    fn into_filters(self) -> Result<MenuItemFilters, ValidationError> {
        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Decimal::from_str(raw).map_err(|_| ValidationError::InvalidFormat {
                field: "price".to_string(),
                expected: "decimal number".to_string(),
            })?),
        };
        Ok(MenuItemFilters {
            category: self.category.filter(|slug| !slug.trim().is_empty()),
            price,
        })
    }
}

// =============================================================================
// MENU ITEMS
// =============================================================================

#[instrument(name = "list_menu_items", skip(state, _caller))]
pub async fn list_menu_items(
    State(state): State<ApiState>,
    _caller: Caller,
    Query(query): Query<MenuItemsQuery>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    let filters = query
        .into_filters()
        .map_err(|err| service_error_to_response(err.into()))?;
    let result = state.catalog_service.list_menu_items(filters).await;
    state
        .finish(Area::Catalog, "list_menu_items", result)
        .map(Json)
}

#[instrument(name = "create_menu_item", skip(state, caller, request), fields(user_id = caller.user_id))]
pub async fn create_menu_item(
    State(state): State<ApiState>,
    caller: Caller,
    JsonBody(request): JsonBody<MenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    let result = state.catalog_service.create_menu_item(&caller, request).await;
    let item = state.finish(Area::Catalog, "create_menu_item", result)?;
    crate::info_with_trace!(menu_item_id = item.id, "Menu item created");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(name = "update_menu_item", skip(state, caller, request), fields(user_id = caller.user_id, menu_item_id = request.id))]
pub async fn update_menu_item(
    State(state): State<ApiState>,
    caller: Caller,
    JsonBody(request): JsonBody<UpdateMenuItemRequest>,
) -> Result<Json<MenuItem>, ApiError> {
    let result = state.catalog_service.update_menu_item(&caller, request).await;
    state
        .finish(Area::Catalog, "update_menu_item", result)
        .map(Json)
}

#[instrument(name = "delete_menu_item", skip(state, caller, request), fields(user_id = caller.user_id, menu_item_id = request.id))]
pub async fn delete_menu_item(
    State(state): State<ApiState>,
    caller: Caller,
    JsonBody(request): JsonBody<DeleteMenuItemRequest>,
) -> Result<StatusCode, ApiError> {
    let result = state.catalog_service.delete_menu_item(&caller, request.id).await;
    state.finish(Area::Catalog, "delete_menu_item", result)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// CATEGORIES
// =============================================================================

#[instrument(name = "list_categories", skip(state, _caller))]
pub async fn list_categories(
    State(state): State<ApiState>,
    _caller: Caller,
) -> Result<Json<Vec<Category>>, ApiError> {
    let result = state.catalog_service.list_categories().await;
    state
        .finish(Area::Catalog, "list_categories", result)
        .map(Json)
}

#[instrument(name = "create_category", skip(state, caller, request), fields(user_id = caller.user_id))]
pub async fn create_category(
    State(state): State<ApiState>,
    caller: Caller,
    JsonBody(request): JsonBody<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let result = state.catalog_service.create_category(&caller, request).await;
    let category = state.finish(Area::Catalog, "create_category", result)?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(name = "get_category", skip(state, _caller), fields(category_id = id))]
pub async fn get_category(
    State(state): State<ApiState>,
    _caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<Category>, ApiError> {
    let result = state.catalog_service.get_category(id).await;
    state.finish(Area::Catalog, "get_category", result).map(Json)
}

#[instrument(name = "update_category", skip(state, caller, request), fields(user_id = caller.user_id, category_id = id))]
pub async fn update_category(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<u64>,
    JsonBody(request): JsonBody<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let result = state
        .catalog_service
        .update_category(&caller, id, request)
        .await;
    state
        .finish(Area::Catalog, "update_category", result)
        .map(Json)
}

#[instrument(name = "delete_category", skip(state, caller), fields(user_id = caller.user_id, category_id = id))]
pub async fn delete_category(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let result = state.catalog_service.delete_category(&caller, id).await;
    state.finish(Area::Catalog, "delete_category", result)?;
    Ok(StatusCode::NO_CONTENT)
}
