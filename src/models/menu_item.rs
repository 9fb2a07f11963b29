use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dish on the menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: u64,
    pub title: String,
    pub price: Decimal,
    pub featured: bool,
    pub category_id: u64,
}

/// Body for creating a menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemRequest {
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub featured: bool,
    #[serde(alias = "category")]
    pub category_id: u64,
}

/// Body for replacing a menu item; the target is named by `id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMenuItemRequest {
    pub id: u64,
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub featured: bool,
    #[serde(alias = "category")]
    pub category_id: u64,
}

/// Body for deleting a menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMenuItemRequest {
    pub id: u64,
}

/// Listing filters; `category` is a category slug, `price` an exact match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemFilters {
    pub category: Option<String>,
    pub price: Option<Decimal>,
}

impl MenuItem {
    pub fn new(id: u64, request: MenuItemRequest) -> Self {
        Self {
            id,
            title: request.title.trim().to_string(),
            price: request.price,
            featured: request.featured,
            category_id: request.category_id,
        }
    }

    /// Check the in-memory part of the filters. Slug matching needs the
    /// category id, so the caller resolves it first.
    pub fn matches(&self, category_id: Option<u64>, price: Option<Decimal>) -> bool {
        category_id.map_or(true, |id| self.category_id == id)
            && price.map_or(true, |p| self.price == p)
    }
}

impl UpdateMenuItemRequest {
    pub fn into_parts(self) -> (u64, MenuItemRequest) {
        (
            self.id,
            MenuItemRequest {
                title: self.title,
                price: self.price,
                featured: self.featured,
                category_id: self.category_id,
            },
        )
    }
}
