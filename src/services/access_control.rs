//! Role predicates. Every rule is a pure function of the caller and, where
//! ownership matters, the order involved.

use crate::models::{Caller, Order, OrderScope, ServiceError, ServiceResult};

pub const CATEGORY_CREATE_DENIED: &str = "Only managers can create categories.";
pub const CATEGORY_UPDATE_DENIED: &str = "Only managers can update categories.";
pub const CATEGORY_DELETE_DENIED: &str = "Only managers can delete categories.";
pub const ORDER_ITEM_CREATE_DENIED: &str = "Only managers or delivery crew can create order items.";
pub const ORDER_ITEM_UPDATE_DENIED: &str =
    "Only assigned delivery crew or managers can update this order item.";
pub const ORDER_ITEM_DELETE_DENIED: &str = "Only managers can delete order items.";
pub const NOT_AUTHORIZED: &str = "Not authorized";

/// Categories and menu items are writable by managers only
pub fn can_manage_catalog(caller: &Caller) -> bool {
    caller.is_manager()
}

/// Orders a caller may list. Managers see everything and may filter on
/// status; delivery crew see their assignments; everyone else their own.
pub fn order_scope(caller: &Caller, status: Option<bool>) -> OrderScope {
    if caller.is_manager() {
        OrderScope::All { status }
    } else if caller.is_delivery_crew() {
        OrderScope::AssignedTo(caller.user_id)
    } else {
        OrderScope::PlacedBy(caller.user_id)
    }
}

/// Only the crew member assigned to the order may mark it delivered
pub fn can_mark_delivered(caller: &Caller, order: &Order) -> bool {
    order.delivery_crew == Some(caller.user_id)
}

pub fn can_create_order_item(caller: &Caller) -> bool {
    caller.is_manager() || caller.is_delivery_crew()
}

/// `order` is the order the item belongs to, if it still exists
pub fn can_update_order_item(caller: &Caller, order: Option<&Order>) -> bool {
    caller.is_manager() || order.map_or(false, |order| can_mark_delivered(caller, order))
}

pub fn can_delete_order_item(caller: &Caller) -> bool {
    caller.is_manager()
}

/// Group membership is administered by superusers, not by managers
pub fn can_administer_groups(caller: &Caller) -> bool {
    caller.is_superuser
}

/// Table setup and seeding
pub fn can_run_admin_tasks(caller: &Caller) -> bool {
    caller.is_superuser
}

pub fn ensure(allowed: bool, message: &str) -> ServiceResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::forbidden(message))
    }
}
