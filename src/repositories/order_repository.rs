use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, ReturnValue, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamo::{
    dynamodb_span, get_bool, get_datetime, get_decimal, get_optional_u64, get_u64,
    map_dynamodb_error, n, s, Item,
};
use super::{IdSequence, DynamoDbOrderItemRepository};
use crate::models::{
    Order, OrderDetail, OrderDraft, OrderScope, RepositoryError, RepositoryResult,
};

const ORDER_SEQUENCE: &str = "orders";
pub(crate) const ORDER_ITEM_SEQUENCE: &str = "order_items";

pub const USER_INDEX: &str = "UserIndex";
pub const DELIVERY_CREW_INDEX: &str = "DeliveryCrewIndex";

/// Cart rows that fit one placement transaction: the order put plus one
/// item put and one cart delete per row, under DynamoDB's 100 action cap.
pub const MAX_ORDER_LINES: usize = 49;

/// Trait defining the interface for order data access operations
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Atomically write the order and its items and remove the cart rows
    /// they were copied from. Fails with TransactionFailed if any cart row
    /// changed since it was read.
    async fn place_order(&self, draft: OrderDraft) -> RepositoryResult<OrderDetail>;

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Order>>;

    /// Orders visible under the scope, ordered by id
    async fn find_orders(&self, scope: OrderScope) -> RepositoryResult<Vec<Order>>;

    /// Set the delivered flag. Fails with NotFound if the order is gone.
    async fn set_status(&self, id: u64, status: bool) -> RepositoryResult<Order>;
}

/// DynamoDB implementation of the OrderRepository trait
pub struct DynamoDbOrderRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    order_items_table_name: String,
    carts_table_name: String,
    region: String,
    sequence: IdSequence,
}

impl DynamoDbOrderRepository {
    pub fn new(
        client: Arc<DynamoDbClient>,
        table_name: String,
        order_items_table_name: String,
        carts_table_name: String,
        region: String,
        sequence: IdSequence,
    ) -> Self {
        Self {
            client,
            table_name,
            order_items_table_name,
            carts_table_name,
            region,
            sequence,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn order_to_item(&self, order: &Order) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), n(order.id));
        item.insert("user_id".to_string(), n(order.user_id));
        if let Some(crew_id) = order.delivery_crew {
            // absent when unassigned so the crew index stays sparse
            item.insert("delivery_crew".to_string(), n(crew_id));
        }
        item.insert("total".to_string(), n(order.total));
        item.insert("status".to_string(), AttributeValue::Bool(order.status));
        item.insert("created_at".to_string(), s(order.created_at.to_rfc3339()));
        item
    }

    pub fn item_to_order(&self, item: &Item) -> RepositoryResult<Order> {
        Ok(Order {
            id: get_u64(item, "id")?,
            user_id: get_u64(item, "user_id")?,
            delivery_crew: get_optional_u64(item, "delivery_crew"),
            total: get_decimal(item, "total")?,
            status: get_bool(item, "status"),
            created_at: get_datetime(item, "created_at")?,
        })
    }

    fn build_put(table_name: &str, item: Item, condition: &str) -> RepositoryResult<TransactWriteItem> {
        let put = Put::builder()
            .table_name(table_name)
            .set_item(Some(item))
            .condition_expression(condition)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build put: {}", e),
            })?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    /// Transaction actions for a placement: the order put, one put per
    /// order item, then one delete per cart row guarded on the quantity and
    /// price the draft was built from.
    pub(crate) fn placement_actions(
        &self,
        draft: &OrderDraft,
        detail: &OrderDetail,
    ) -> RepositoryResult<Vec<TransactWriteItem>> {
        let mut actions = Vec::with_capacity(1 + draft.lines.len() * 2);
        actions.push(Self::build_put(
            &self.table_name,
            self.order_to_item(&detail.order),
            "attribute_not_exists(id)",
        )?);
        for order_item in &detail.items {
            actions.push(Self::build_put(
                &self.order_items_table_name,
                DynamoDbOrderItemRepository::order_item_to_item(order_item),
                "attribute_not_exists(id)",
            )?);
        }
        for line in &draft.lines {
            let delete = Delete::builder()
                .table_name(&self.carts_table_name)
                .key("user_id", n(line.user_id))
                .key("menuitem_id", n(line.menuitem_id))
                .condition_expression("#quantity = :quantity AND #price = :price")
                .expression_attribute_names("#quantity", "quantity")
                .expression_attribute_names("#price", "price")
                .expression_attribute_values(":quantity", n(line.quantity))
                .expression_attribute_values(":price", n(line.price))
                .build()
                .map_err(|e| RepositoryError::AwsSdk {
                    message: format!("Failed to build delete: {}", e),
                })?;
            actions.push(TransactWriteItem::builder().delete(delete).build());
        }
        Ok(actions)
    }

    fn parse_orders(&self, items: &[Item]) -> Vec<Order> {
        let mut orders = Vec::with_capacity(items.len());
        for item in items {
            match self.item_to_order(item) {
                Ok(order) => orders.push(order),
                Err(e) => warn!("Failed to parse order item: {}", e),
            }
        }
        orders.sort_by_key(|order| order.id);
        orders
    }

    async fn query_index(&self, index: &str, key: &str, value: u64) -> RepositoryResult<Vec<Item>> {
        let span = dynamodb_span("Query", &self.table_name, &self.region);
        async {
            self.client
                .query()
                .table_name(&self.table_name)
                .index_name(index)
                .key_condition_expression(format!("{} = :value", key))
                .expression_attribute_values(":value", n(value))
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
impl OrderRepository for DynamoDbOrderRepository {
    #[instrument(skip(self, draft), fields(table = %self.table_name, user_id = draft.user_id, lines = draft.lines.len()))]
    async fn place_order(&self, draft: OrderDraft) -> RepositoryResult<OrderDetail> {
        if draft.lines.is_empty() || draft.lines.len() > MAX_ORDER_LINES {
            return Err(RepositoryError::InvalidQuery {
                message: format!(
                    "An order needs between 1 and {} cart rows, got {}",
                    MAX_ORDER_LINES,
                    draft.lines.len()
                ),
            });
        }

        let order_id = self.sequence.next(ORDER_SEQUENCE).await?;
        let first_item_id = self
            .sequence
            .reserve(ORDER_ITEM_SEQUENCE, draft.lines.len() as u64)
            .await?;
        let detail = draft.materialize(order_id, first_item_id);

        let actions = self.placement_actions(&draft, &detail)?;

        let span = dynamodb_span("TransactWriteItems", &self.table_name, &self.region);
        async {
            self.client
                .transact_write_items()
                .set_transact_items(Some(actions))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        info!(order_id = detail.order.id, total = %detail.order.total, "Order placed");
        Ok(detail)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id))]
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Order>> {
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
            .map(|item| self.item_to_order(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.table_name, scope = ?scope))]
    async fn find_orders(&self, scope: OrderScope) -> RepositoryResult<Vec<Order>> {
        let items = match scope {
            OrderScope::All { status } => {
                let mut scan_builder = self.client.scan().table_name(&self.table_name);
                if let Some(status) = status {
                    scan_builder = scan_builder
                        .filter_expression("#status = :status")
                        .expression_attribute_names("#status", "status")
                        .expression_attribute_values(":status", AttributeValue::Bool(status));
                }

                let span = dynamodb_span("Scan", &self.table_name, &self.region);
                async {
                    scan_builder
                        .into_paginator()
                        .items()
                        .send()
                        .collect::<Result<Vec<_>, _>>()
                        .await
                        .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
                }
                .instrument(span)
                .await?
            }
            OrderScope::AssignedTo(crew_id) => {
                self.query_index(DELIVERY_CREW_INDEX, "delivery_crew", crew_id)
                    .await?
            }
            OrderScope::PlacedBy(user_id) => {
                self.query_index(USER_INDEX, "user_id", user_id).await?
            }
        };

        let orders = self.parse_orders(&items);
        info!("Found {} orders", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id, status = status))]
    async fn set_status(&self, id: u64, status: bool) -> RepositoryResult<Order> {
        let span = dynamodb_span("UpdateItem", &self.table_name, &self.region);
        let response = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key("id", n(id))
                .update_expression("SET #status = :status")
                .condition_expression("attribute_exists(id)")
                .expression_attribute_names("#status", "status")
                .expression_attribute_values(":status", AttributeValue::Bool(status))
                .return_values(ReturnValue::AllNew)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        let attributes = response.attributes.ok_or(RepositoryError::NotFound)?;
        self.item_to_order(&attributes)
    }
}
