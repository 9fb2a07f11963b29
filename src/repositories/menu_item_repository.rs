use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamo::{
    dynamodb_span, get_bool, get_decimal, get_string, get_u64, map_dynamodb_error, n, s, Item,
};
use super::IdSequence;
use crate::models::{MenuItem, MenuItemRequest, RepositoryResult};

const SEQUENCE_NAME: &str = "menu_items";

/// Trait defining the interface for menu item data access operations
#[async_trait]
pub trait MenuItemRepository: Send + Sync {
    /// Menu items ordered by id, optionally narrowed to one category and an exact price
    async fn find_all(
        &self,
        category_id: Option<u64>,
        price: Option<Decimal>,
    ) -> RepositoryResult<Vec<MenuItem>>;

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MenuItem>>;

    async fn create(&self, request: MenuItemRequest) -> RepositoryResult<MenuItem>;

    /// Replace an existing item. Fails with NotFound if it is gone.
    async fn update(&self, item: MenuItem) -> RepositoryResult<MenuItem>;

    /// Delete an existing item. Fails with NotFound if it is gone.
    async fn delete(&self, id: u64) -> RepositoryResult<()>;

    /// Whether any menu item references the category
    async fn exists_in_category(&self, category_id: u64) -> RepositoryResult<bool>;
}

/// DynamoDB implementation of the MenuItemRepository trait
pub struct DynamoDbMenuItemRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
    sequence: IdSequence,
}

impl DynamoDbMenuItemRepository {
    pub fn new(
        client: Arc<DynamoDbClient>,
        table_name: String,
        region: String,
        sequence: IdSequence,
    ) -> Self {
        Self {
            client,
            table_name,
            region,
            sequence,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn menu_item_to_item(&self, menu_item: &MenuItem) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), n(menu_item.id));
        item.insert("title".to_string(), s(&menu_item.title));
        item.insert("price".to_string(), n(menu_item.price));
        item.insert(
            "featured".to_string(),
            AttributeValue::Bool(menu_item.featured),
        );
        item.insert("category_id".to_string(), n(menu_item.category_id));
        item
    }

    pub fn item_to_menu_item(&self, item: &Item) -> RepositoryResult<MenuItem> {
        Ok(MenuItem {
            id: get_u64(item, "id")?,
            title: get_string(item, "title")?,
            price: get_decimal(item, "price")?,
            featured: get_bool(item, "featured"),
            category_id: get_u64(item, "category_id")?,
        })
    }

    async fn put(&self, menu_item: &MenuItem, condition: &str) -> RepositoryResult<()> {
        let span = dynamodb_span("PutItem", &self.table_name, &self.region);
        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(self.menu_item_to_item(menu_item)))
                .condition_expression(condition)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MenuItemRepository for DynamoDbMenuItemRepository {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(
        &self,
        category_id: Option<u64>,
        price: Option<Decimal>,
    ) -> RepositoryResult<Vec<MenuItem>> {
        info!("Finding menu items with filters");

        let mut filter_expressions = Vec::new();
        let mut expression_attribute_values = HashMap::new();

        if let Some(category_id) = category_id {
            filter_expressions.push("category_id = :category_id");
            expression_attribute_values.insert(":category_id".to_string(), n(category_id));
        }

        if let Some(price) = price {
            filter_expressions.push("price = :price");
            expression_attribute_values.insert(":price".to_string(), n(price));
        }

        let mut scan_builder = self
            .client
            .scan()
            .table_name(&self.table_name)
            .select(Select::AllAttributes);

        if !filter_expressions.is_empty() {
            scan_builder = scan_builder
                .filter_expression(filter_expressions.join(" AND "))
                .set_expression_attribute_values(Some(expression_attribute_values));
        }

        let span = dynamodb_span("Scan", &self.table_name, &self.region);
        let items: Vec<Item> = async {
            scan_builder
                .into_paginator()
                .items()
                .send()
                .collect::<Result<Vec<_>, _>>()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        let mut menu_items = Vec::with_capacity(items.len());
        for item in &items {
            match self.item_to_menu_item(item) {
                Ok(menu_item) => menu_items.push(menu_item),
                Err(e) => warn!("Failed to parse menu item: {}", e),
            }
        }
        menu_items.sort_by_key(|menu_item| menu_item.id);

        info!("Found {} menu items", menu_items.len());
        Ok(menu_items)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id))]
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MenuItem>> {
        let span = dynamodb_span("GetItem", &self.table_name, &self.region);
        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("id", n(id))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        response
            .item
            .map(|item| self.item_to_menu_item(&item))
            .transpose()
    }

    #[instrument(skip(self, request), fields(table = %self.table_name, title = %request.title))]
    async fn create(&self, request: MenuItemRequest) -> RepositoryResult<MenuItem> {
        let id = self.sequence.next(SEQUENCE_NAME).await?;
        let menu_item = MenuItem::new(id, request);
        self.put(&menu_item, "attribute_not_exists(id)").await?;

        info!(id = menu_item.id, "Menu item created");
        Ok(menu_item)
    }

    #[instrument(skip(self, menu_item), fields(table = %self.table_name, id = menu_item.id))]
    async fn update(&self, menu_item: MenuItem) -> RepositoryResult<MenuItem> {
        self.put(&menu_item, "attribute_exists(id)").await?;

        info!("Menu item updated");
        Ok(menu_item)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id))]
    async fn delete(&self, id: u64) -> RepositoryResult<()> {
        let span = dynamodb_span("DeleteItem", &self.table_name, &self.region);
        async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key("id", n(id))
                .condition_expression("attribute_exists(id)")
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        info!("Menu item deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table_name, category_id = category_id))]
    async fn exists_in_category(&self, category_id: u64) -> RepositoryResult<bool> {
        let span = dynamodb_span("Scan", &self.table_name, &self.region);
        let items: Vec<Item> = async {
            self.client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("category_id = :category_id")
                .expression_attribute_values(":category_id", n(category_id))
                .projection_expression("id")
                .into_paginator()
                .items()
                .send()
                .collect::<Result<Vec<_>, _>>()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        Ok(!items.is_empty())
    }
}
