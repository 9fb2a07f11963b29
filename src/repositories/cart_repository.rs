use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, Instrument};

use super::dynamo::{dynamodb_span, get_decimal, get_u32, get_u64, map_dynamodb_error, n, Item};
use crate::models::{CartLine, RepositoryResult};

/// Trait defining the interface for cart data access operations
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// All cart rows of a user, ordered by menu item id
    async fn find_lines(&self, user_id: u64) -> RepositoryResult<Vec<CartLine>>;

    /// Write the (user, menu item) row, replacing any existing one
    async fn upsert_line(&self, line: CartLine) -> RepositoryResult<CartLine>;

    /// Delete every row of a user and return how many were removed
    async fn clear(&self, user_id: u64) -> RepositoryResult<usize>;
}

/// DynamoDB implementation keyed on `user_id` (hash) and `menuitem_id` (range)
pub struct DynamoDbCartRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbCartRepository {
    /// Create a new DynamoDB cart repository
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    /// Get the table name (for testing)
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn line_to_item(&self, line: &CartLine) -> Item {
        let mut item = Item::new();
        item.insert("user_id".to_string(), n(line.user_id));
        item.insert("menuitem_id".to_string(), n(line.menuitem_id));
        item.insert("quantity".to_string(), n(line.quantity));
        item.insert("unit_price".to_string(), n(line.unit_price));
        item.insert("price".to_string(), n(line.price));
        item
    }

    pub fn item_to_line(&self, item: &Item) -> RepositoryResult<CartLine> {
        Ok(CartLine {
            user_id: get_u64(item, "user_id")?,
            menuitem_id: get_u64(item, "menuitem_id")?,
            quantity: get_u32(item, "quantity")?,
            unit_price: get_decimal(item, "unit_price")?,
            price: get_decimal(item, "price")?,
        })
    }

    async fn query_rows(&self, user_id: u64) -> RepositoryResult<Vec<Item>> {
        let span = dynamodb_span("Query", &self.table_name, &self.region);
        async {
            self.client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("user_id = :user_id")
                .expression_attribute_values(":user_id", n(user_id))
                .consistent_read(true)
                .into_paginator()
                .items()
                .send()
                .collect::<Result<Vec<_>, _>>()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl CartRepository for DynamoDbCartRepository {
    #[instrument(skip(self), fields(table = %self.table_name, user_id = user_id))]
    async fn find_lines(&self, user_id: u64) -> RepositoryResult<Vec<CartLine>> {
        let items = self.query_rows(user_id).await?;
        let lines = items
            .iter()
            .map(|item| self.item_to_line(item))
            .collect::<RepositoryResult<Vec<_>>>()?;

        info!("Cart has {} rows", lines.len());
        Ok(lines)
    }

    #[instrument(skip(self, line), fields(table = %self.table_name, user_id = line.user_id, menuitem_id = line.menuitem_id))]
    async fn upsert_line(&self, line: CartLine) -> RepositoryResult<CartLine> {
        let span = dynamodb_span("PutItem", &self.table_name, &self.region);
        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(self.line_to_item(&line)))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        info!(quantity = line.quantity, "Cart row written");
        Ok(line)
    }

    #[instrument(skip(self), fields(table = %self.table_name, user_id = user_id))]
    async fn clear(&self, user_id: u64) -> RepositoryResult<usize> {
        // keys only, so rows that no longer parse are removed too
        let menuitem_ids = row_keys(&self.query_rows(user_id).await?)?;

        for menuitem_id in &menuitem_ids {
            let span = dynamodb_span("DeleteItem", &self.table_name, &self.region);
            async {
                self.client
                    .delete_item()
                    .table_name(&self.table_name)
                    .key("user_id", n(user_id))
                    .key("menuitem_id", n(*menuitem_id))
                    .send()
                    .await
                    .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
            }
            .instrument(span)
            .await?;
        }

        info!("Cleared {} cart rows", menuitem_ids.len());
        Ok(menuitem_ids.len())
    }
}

/// Range keys of raw cart rows
pub(crate) fn row_keys(items: &[Item]) -> RepositoryResult<Vec<u64>> {
    items
        .iter()
        .map(|item| get_u64(item, "menuitem_id"))
        .collect()
}
