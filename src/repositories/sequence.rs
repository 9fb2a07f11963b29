use aws_sdk_dynamodb::types::ReturnValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{debug, instrument, Instrument};

use super::dynamo::{dynamodb_span, get_u64, map_dynamodb_error, n, s};
use crate::models::{RepositoryError, RepositoryResult};

/// Monotonic numeric id allocator backed by a counters table
/// (`name` hash key, `next_id` number).
#[derive(Clone)]
pub struct IdSequence {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl IdSequence {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Reserve `count` consecutive ids for `name` and return the first one
    #[instrument(skip(self), fields(table = %self.table_name))]
    pub async fn reserve(&self, name: &str, count: u64) -> RepositoryResult<u64> {
        if count == 0 {
            return Err(RepositoryError::InvalidQuery {
                message: "Cannot reserve zero ids".to_string(),
            });
        }

        let span = dynamodb_span("UpdateItem", &self.table_name, &self.region);
        let response = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key("name", s(name))
                .update_expression("ADD next_id :n")
                .expression_attribute_values(":n", n(count))
                .return_values(ReturnValue::UpdatedNew)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        let attributes = response.attributes.unwrap_or_default();
        let last = get_u64(&attributes, "next_id")?;
        let first = last + 1 - count;

        debug!(sequence = name, first, last, "Reserved ids");
        Ok(first)
    }

    pub async fn next(&self, name: &str) -> RepositoryResult<u64> {
        self.reserve(name, 1).await
    }
}
