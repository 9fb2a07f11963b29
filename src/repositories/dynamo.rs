use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Error as DynamoDbError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::error;

use crate::models::{RepositoryError, RepositoryResult};

pub(crate) type Item = HashMap<String, AttributeValue>;

/// Client span for one DynamoDB call, carrying the X-Ray and OpenTelemetry
/// attributes the collector uses to draw the remote node.
pub(crate) fn dynamodb_span(operation: &str, table_name: &str, region: &str) -> tracing::Span {
    let endpoint = format!("https://dynamodb.{}.amazonaws.com", region);
    tracing::info_span!(
        "DynamoDB",
        "aws.service" = "DynamoDB",
        "aws.operation" = operation,
        "aws.region" = %region,
        "aws.dynamodb.table_name" = %table_name,
        "aws.remote.service" = "AWS::DynamoDB",
        "aws.remote.operation" = operation,
        "aws.remote.resource.type" = "AWS::DynamoDB::Table",
        "aws.remote.resource.identifier" = %table_name,
        "table.name" = %table_name,
        "endpoint" = %endpoint,
        "otel.kind" = "client",
        "otel.name" = format!("DynamoDB.{}", operation),
        "rpc.system" = "aws-api",
        "rpc.service" = "AmazonDynamoDBv2",
        "rpc.method" = operation,
        "http.method" = "POST",
        "http.url" = %endpoint,
        "db.system" = "dynamodb",
        "db.name" = %table_name,
        "db.operation" = operation,
        "component" = "aws-sdk-dynamodb",
    )
}

/// Convert a DynamoDB error into a RepositoryError. A failed condition on a
/// single-item write means the guarded item was missing.
pub(crate) fn map_dynamodb_error(error: DynamoDbError, table_name: &str) -> RepositoryError {
    match error {
        DynamoDbError::ResourceNotFoundException(_) => {
            error!(table = %table_name, "DynamoDB table not found");
            RepositoryError::TableNotFound {
                table_name: table_name.to_string(),
            }
        }
        DynamoDbError::ConditionalCheckFailedException(_) => RepositoryError::NotFound,
        DynamoDbError::TransactionCanceledException(e) => RepositoryError::TransactionFailed {
            message: e.to_string(),
        },
        DynamoDbError::ProvisionedThroughputExceededException(_)
        | DynamoDbError::RequestLimitExceeded(_) => RepositoryError::RateLimitExceeded,
        other => {
            error!("DynamoDB error: {:?}", other);
            RepositoryError::AwsSdk {
                message: other.to_string(),
            }
        }
    }
}

/// Positions of the transaction actions whose condition check failed
pub(crate) fn failed_conditions(error: &DynamoDbError) -> Vec<usize> {
    match error {
        DynamoDbError::TransactionCanceledException(e) => e
            .cancellation_reasons()
            .iter()
            .enumerate()
            .filter(|(_, reason)| reason.code() == Some("ConditionalCheckFailed"))
            .map(|(index, _)| index)
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn n(value: impl ToString) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

pub(crate) fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

fn missing(key: &str) -> RepositoryError {
    RepositoryError::InvalidQuery {
        message: format!("Missing or invalid {}", key),
    }
}

pub(crate) fn get_u64(item: &Item, key: &str) -> RepositoryResult<u64> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| missing(key))
}

pub(crate) fn get_u32(item: &Item, key: &str) -> RepositoryResult<u32> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| missing(key))
}

pub(crate) fn get_optional_u64(item: &Item, key: &str) -> Option<u64> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|v| v.parse().ok())
}

pub(crate) fn get_string(item: &Item, key: &str) -> RepositoryResult<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| missing(key))
}

pub(crate) fn get_decimal(item: &Item, key: &str) -> RepositoryResult<Decimal> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|v| Decimal::from_str(v).ok())
        .ok_or_else(|| missing(key))
}

pub(crate) fn get_bool(item: &Item, key: &str) -> bool {
    item.get(key)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .unwrap_or(false)
}

pub(crate) fn get_datetime(item: &Item, key: &str) -> RepositoryResult<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| missing(key))
}

pub(crate) fn get_string_set(item: &Item, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_ss().ok())
        .cloned()
        .unwrap_or_default()
}
