use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

use super::access_control::{
    can_create_order_item, can_delete_order_item, can_mark_delivered, can_update_order_item,
    ensure, order_scope, NOT_AUTHORIZED, ORDER_ITEM_CREATE_DENIED, ORDER_ITEM_DELETE_DENIED,
    ORDER_ITEM_UPDATE_DENIED,
};
use crate::models::{
    Caller, Order, OrderDetail, OrderDraft, OrderItem, OrderItemRequest, RepositoryError,
    ServiceError, ServiceResult, Validate, ValidationError,
};
use crate::repositories::{
    CartRepository, MenuItemRepository, OrderItemRepository, OrderRepository, MAX_ORDER_LINES,
};

pub const EMPTY_CART: &str = "No items in cart";

/// Orders and their line items
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    order_items: Arc<dyn OrderItemRepository>,
    carts: Arc<dyn CartRepository>,
    menu_items: Arc<dyn MenuItemRepository>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        order_items: Arc<dyn OrderItemRepository>,
        carts: Arc<dyn CartRepository>,
        menu_items: Arc<dyn MenuItemRepository>,
    ) -> Self {
        Self {
            orders,
            order_items,
            carts,
            menu_items,
        }
    }

    /// Turn the caller's cart into an order. The order, its items and the
    /// removal of the cart rows commit together or not at all.
    #[instrument(skip(self, caller), fields(user_id = caller.user_id))]
    pub async fn place_order(&self, caller: &Caller) -> ServiceResult<OrderDetail> {
        let lines = self.carts.find_lines(caller.user_id).await?;

        if lines.is_empty() {
            crate::warn_with_trace!("Order placement with empty cart");
            return Err(ServiceError::invalid_state(EMPTY_CART));
        }
        if lines.len() > MAX_ORDER_LINES {
            return Err(ServiceError::invalid_state(format!(
                "Cart has {} items; at most {} can be ordered at once",
                lines.len(),
                MAX_ORDER_LINES
            )));
        }

        let draft = OrderDraft::from_cart(caller.user_id, lines, Utc::now());
        let detail = self.orders.place_order(draft).await?;

        crate::info_with_trace!(
            order_id = detail.order.id,
            total = %detail.order.total,
            items = detail.items.len(),
            "Order placed"
        );
        Ok(detail)
    }

    /// Orders visible to the caller. The status filter only narrows a
    /// manager's view.
    #[instrument(skip(self, caller), fields(user_id = caller.user_id))]
    pub async fn browse_orders(
        &self,
        caller: &Caller,
        status: Option<bool>,
    ) -> ServiceResult<Vec<Order>> {
        let scope = order_scope(caller, status);
        let orders = self.orders.find_orders(scope).await?;
        crate::info_with_trace!(scope = ?scope, "Found {} orders", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self, caller), fields(user_id = caller.user_id, order_id = order_id))]
    pub async fn mark_delivered(&self, caller: &Caller, order_id: u64) -> ServiceResult<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound { id: order_id })?;

        ensure(can_mark_delivered(caller, &order), NOT_AUTHORIZED)?;

        let order = self
            .orders
            .set_status(order_id, true)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::OrderNotFound { id: order_id },
                other => other.into(),
            })?;

        crate::info_with_trace!("Order marked as delivered");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn list_order_items(&self) -> ServiceResult<Vec<OrderItem>> {
        Ok(self.order_items.find_all().await?)
    }

    #[instrument(skip(self), fields(order_item_id = id))]
    pub async fn get_order_item(&self, id: u64) -> ServiceResult<OrderItem> {
        self.order_items
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::OrderItemNotFound { id })
    }

    #[instrument(skip(self, caller, request), fields(user_id = caller.user_id, order_id = request.order_id))]
    pub async fn create_order_item(
        &self,
        caller: &Caller,
        request: OrderItemRequest,
    ) -> ServiceResult<OrderItem> {
        ensure(can_create_order_item(caller), ORDER_ITEM_CREATE_DENIED)?;
        request.validate()?;
        self.require_references(&request).await?;

        let item = self.order_items.create(request).await?;
        crate::info_with_trace!(order_item_id = item.id, "Order item created");
        Ok(item)
    }

    /// Managers may edit any item; delivery crew only items of orders
    /// assigned to them. The order total is left as placed.
    #[instrument(skip(self, caller, request), fields(user_id = caller.user_id, order_item_id = id))]
    pub async fn update_order_item(
        &self,
        caller: &Caller,
        id: u64,
        request: OrderItemRequest,
    ) -> ServiceResult<OrderItem> {
        let mut item = self.get_order_item(id).await?;
        let order = self.orders.find_by_id(item.order_id).await?;
        ensure(
            can_update_order_item(caller, order.as_ref()),
            ORDER_ITEM_UPDATE_DENIED,
        )?;

        request.validate()?;
        self.require_references(&request).await?;

        item.apply(request);
        let updated = self.order_items.update(item).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::OrderItemNotFound { id },
            other => other.into(),
        })?;

        crate::info_with_trace!("Order item updated");
        Ok(updated)
    }

    #[instrument(skip(self, caller), fields(user_id = caller.user_id, order_item_id = id))]
    pub async fn delete_order_item(&self, caller: &Caller, id: u64) -> ServiceResult<()> {
        self.get_order_item(id).await?;
        ensure(can_delete_order_item(caller), ORDER_ITEM_DELETE_DENIED)?;

        self.order_items.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::OrderItemNotFound { id },
            other => other.into(),
        })?;

        crate::info_with_trace!("Order item deleted");
        Ok(())
    }

    async fn require_references(&self, request: &OrderItemRequest) -> ServiceResult<()> {
        if self.orders.find_by_id(request.order_id).await?.is_none() {
            return Err(ValidationError::UnknownReference {
                field: "order_id".to_string(),
                value: request.order_id.to_string(),
            }
            .into());
        }
        if self.menu_items.find_by_id(request.menuitem_id).await?.is_none() {
            return Err(ValidationError::UnknownReference {
                field: "menuitem_id".to_string(),
                value: request.menuitem_id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
