use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamo::{dynamodb_span, get_decimal, get_u32, get_u64, map_dynamodb_error, n, Item};
use super::order_repository::ORDER_ITEM_SEQUENCE;
use super::IdSequence;
use crate::models::{OrderItem, OrderItemRequest, RepositoryResult};

/// Trait defining the interface for order item data access operations
#[async_trait]
pub trait OrderItemRepository: Send + Sync {
    /// All order items ordered by id
    async fn find_all(&self) -> RepositoryResult<Vec<OrderItem>>;

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<OrderItem>>;

    async fn create(&self, request: OrderItemRequest) -> RepositoryResult<OrderItem>;

    /// Replace an existing item. Fails with NotFound if it is gone.
    async fn update(&self, item: OrderItem) -> RepositoryResult<OrderItem>;

    /// Delete an existing item. Fails with NotFound if it is gone.
    async fn delete(&self, id: u64) -> RepositoryResult<()>;
}

/// DynamoDB implementation of the OrderItemRepository trait
pub struct DynamoDbOrderItemRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
    sequence: IdSequence,
}

impl DynamoDbOrderItemRepository {
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

    pub fn order_item_to_item(order_item: &OrderItem) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), n(order_item.id));
        item.insert("order_id".to_string(), n(order_item.order_id));
        item.insert("menuitem_id".to_string(), n(order_item.menuitem_id));
        item.insert("quantity".to_string(), n(order_item.quantity));
        item.insert("unit_price".to_string(), n(order_item.unit_price));
        item.insert("price".to_string(), n(order_item.price));
        item
    }

    pub fn item_to_order_item(item: &Item) -> RepositoryResult<OrderItem> {
        Ok(OrderItem {
            id: get_u64(item, "id")?,
            order_id: get_u64(item, "order_id")?,
            menuitem_id: get_u64(item, "menuitem_id")?,
            quantity: get_u32(item, "quantity")?,
            unit_price: get_decimal(item, "unit_price")?,
            price: get_decimal(item, "price")?,
        })
    }

    async fn put(&self, order_item: &OrderItem, condition: &str) -> RepositoryResult<()> {
        let span = dynamodb_span("PutItem", &self.table_name, &self.region);
        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(Self::order_item_to_item(order_item)))
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
impl OrderItemRepository for DynamoDbOrderItemRepository {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<OrderItem>> {
        let span = dynamodb_span("Scan", &self.table_name, &self.region);
        let items: Vec<Item> = async {
            self.client
                .scan()
                .table_name(&self.table_name)
                .into_paginator()
                .items()
                .send()
                .collect::<Result<Vec<_>, _>>()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        let mut order_items = Vec::with_capacity(items.len());
        for item in &items {
            match Self::item_to_order_item(item) {
                Ok(order_item) => order_items.push(order_item),
                Err(e) => warn!("Failed to parse order item: {}", e),
            }
        }
        order_items.sort_by_key(|order_item| order_item.id);

        info!("Found {} order items", order_items.len());
        Ok(order_items)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id))]
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<OrderItem>> {
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
            .map(|item| Self::item_to_order_item(&item))
            .transpose()
    }

    #[instrument(skip(self, request), fields(table = %self.table_name, order_id = request.order_id))]
    async fn create(&self, request: OrderItemRequest) -> RepositoryResult<OrderItem> {
        let id = self.sequence.next(ORDER_ITEM_SEQUENCE).await?;
        let order_item = OrderItem::new(id, request);
        self.put(&order_item, "attribute_not_exists(id)").await?;

        info!(id = order_item.id, "Order item created");
        Ok(order_item)
    }

    #[instrument(skip(self, order_item), fields(table = %self.table_name, id = order_item.id))]
    async fn update(&self, order_item: OrderItem) -> RepositoryResult<OrderItem> {
        self.put(&order_item, "attribute_exists(id)").await?;

        info!("Order item updated");
        Ok(order_item)
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

        info!("Order item deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_item_conversion() {
        let order_item = OrderItem {
            id: 30,
            order_id: 12,
            menuitem_id: 5,
            quantity: 1,
            unit_price: dec!(10.00),
            price: dec!(10.00),
        };

        let item = DynamoDbOrderItemRepository::order_item_to_item(&order_item);
        let converted = DynamoDbOrderItemRepository::item_to_order_item(&item).unwrap();
        assert_eq!(converted, order_item);
    }

    #[test]
    fn test_item_to_order_item_missing_order() {
        let mut item = Item::new();
        item.insert("id".to_string(), n(30));

        assert!(DynamoDbOrderItemRepository::item_to_order_item(&item).is_err());
    }
}
