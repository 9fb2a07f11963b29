use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{cart_total, CartLine};

/// A placed order. `total` is fixed when the order is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub delivery_crew: Option<u64>,
    pub total: Decimal,
    pub status: bool,
    pub created_at: DateTime<Utc>,
}

/// One line of an order, copied from a cart row at placement time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: u64,
    pub order_id: u64,
    pub menuitem_id: u64,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub price: Decimal,
}

/// Body for creating or replacing an order item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    #[serde(alias = "order")]
    pub order_id: u64,
    #[serde(alias = "menuitem")]
    pub menuitem_id: u64,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// An order with its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Everything needed to write an order from a cart, before ids are assigned
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub user_id: u64,
    pub total: Decimal,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
}

/// Which orders a caller may list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All { status: Option<bool> },
    AssignedTo(u64),
    PlacedBy(u64),
}

impl OrderItem {
    pub fn from_cart_line(id: u64, order_id: u64, line: &CartLine) -> Self {
        Self {
            id,
            order_id,
            menuitem_id: line.menuitem_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            price: line.price,
        }
    }

    pub fn new(id: u64, request: OrderItemRequest) -> Self {
        let mut item = Self {
            id,
            order_id: 0,
            menuitem_id: 0,
            quantity: 0,
            unit_price: Decimal::ZERO,
            price: Decimal::ZERO,
        };
        item.apply(request);
        item
    }

    /// Replace all writable fields and derive `price`
    pub fn apply(&mut self, request: OrderItemRequest) {
        self.order_id = request.order_id;
        self.menuitem_id = request.menuitem_id;
        self.quantity = request.quantity;
        self.unit_price = request.unit_price;
        self.price = request.unit_price * Decimal::from(request.quantity);
    }
}

impl OrderDraft {
    pub fn from_cart(user_id: u64, lines: Vec<CartLine>, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total: cart_total(&lines),
            lines,
            created_at,
        }
    }

    /// Build the order and its items from allocated ids. Item ids run
    /// consecutively from `first_item_id` in cart order.
    pub fn materialize(&self, order_id: u64, first_item_id: u64) -> OrderDetail {
        let order = Order {
            id: order_id,
            user_id: self.user_id,
            delivery_crew: None,
            total: self.total,
            status: false,
            created_at: self.created_at,
        };
        let items = self
            .lines
            .iter()
            .enumerate()
            .map(|(offset, line)| OrderItem::from_cart_line(first_item_id + offset as u64, order_id, line))
            .collect();

        OrderDetail { order, items }
    }
}

impl OrderScope {
    pub fn includes(&self, order: &Order) -> bool {
        match self {
            OrderScope::All { status } => status.map_or(true, |s| order.status == s),
            OrderScope::AssignedTo(crew_id) => order.delivery_crew == Some(*crew_id),
            OrderScope::PlacedBy(user_id) => order.user_id == *user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MenuItem, MenuItemRequest};
    use rust_decimal_macros::dec;

    fn line(menuitem_id: u64, price: Decimal, quantity: u32) -> CartLine {
        let menu_item = MenuItem::new(
            menuitem_id,
            MenuItemRequest {
                title: "Dish".to_string(),
                price,
                featured: false,
                category_id: 1,
            },
        );
        CartLine::new(42, &menu_item, quantity)
    }

    #[test]
    fn test_draft_materialize_snapshots_lines() {
        let draft = OrderDraft::from_cart(
            42,
            vec![line(5, dec!(10.00), 1), line(6, dec!(3.25), 4)],
            Utc::now(),
        );
        assert_eq!(draft.total, dec!(23.00));

        let detail = draft.materialize(100, 200);
        assert_eq!(detail.order.id, 100);
        assert_eq!(detail.order.total, dec!(23.00));
        assert!(!detail.order.status);
        assert_eq!(detail.order.delivery_crew, None);

        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].id, 200);
        assert_eq!(detail.items[1].id, 201);
        assert_eq!(detail.items[1].order_id, 100);
        assert_eq!(detail.items[1].quantity, 4);
        assert_eq!(detail.items[1].price, dec!(13.00));
    }

    #[test]
    fn test_order_item_apply_derives_price() {
        let item = OrderItem::new(
            1,
            OrderItemRequest {
                order_id: 3,
                menuitem_id: 5,
                quantity: 3,
                unit_price: dec!(2.50),
            },
        );
        assert_eq!(item.price, dec!(7.50));
    }

    #[test]
    fn test_order_scope_includes() {
        let order = Order {
            id: 1,
            user_id: 10,
            delivery_crew: Some(20),
            total: dec!(5),
            status: false,
            created_at: Utc::now(),
        };

        assert!(OrderScope::All { status: None }.includes(&order));
        assert!(OrderScope::All { status: Some(false) }.includes(&order));
        assert!(!OrderScope::All { status: Some(true) }.includes(&order));
        assert!(OrderScope::AssignedTo(20).includes(&order));
        assert!(!OrderScope::AssignedTo(10).includes(&order));
        assert!(OrderScope::PlacedBy(10).includes(&order));
        assert!(!OrderScope::PlacedBy(20).includes(&order));
    }

    #[test]
    fn test_order_detail_serializes_flat() {
        let detail = OrderDraft::from_cart(42, vec![line(5, dec!(10.00), 1)], Utc::now())
            .materialize(7, 8);
        let value = serde_json::to_value(&detail).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["total"], "10.00");
        assert_eq!(value["items"][0]["menuitem_id"], 5);
    }
}
