use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::MenuItem;

/// One (user, menu item) row of a shopping cart. Prices are captured when
/// the row is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub user_id: u64,
    pub menuitem_id: u64,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub price: Decimal,
}

/// Request model for adding an item to the cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    #[serde(alias = "menuitem")]
    pub menuitem_id: u64,
    pub quantity: u32,
}

/// The caller's cart with totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResponse {
    pub user_id: u64,
    pub items: Vec<CartLine>,
    pub total_items: u32,
    pub total_price: Decimal,
}

impl CartLine {
    pub fn new(user_id: u64, menu_item: &MenuItem, quantity: u32) -> Self {
        let unit_price = menu_item.price;
        Self {
            user_id,
            menuitem_id: menu_item.id,
            quantity,
            unit_price,
            price: unit_price * Decimal::from(quantity),
        }
    }
}

impl CartResponse {
    pub fn from_lines(user_id: u64, items: Vec<CartLine>) -> Self {
        let total_items = items.iter().map(|line| line.quantity).sum();
        let total_price = cart_total(&items);
        Self {
            user_id,
            items,
            total_items,
            total_price,
        }
    }
}

/// Sum of the line prices
pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(|line| line.price).sum()
}
