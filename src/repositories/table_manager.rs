use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::dynamo::map_dynamodb_error;
use super::order_repository::{DELIVERY_CREW_INDEX, USER_INDEX};
use crate::config::DatabaseConfig;
use crate::models::{RepositoryError, RepositoryResult};

/// Key layout of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub hash_key: (&'static str, ScalarAttributeType),
    pub range_key: Option<(&'static str, ScalarAttributeType)>,
    /// (index name, hash attribute) pairs; index keys are numeric
    pub indexes: Vec<(&'static str, &'static str)>,
}

impl TableSpec {
    fn hash(name: &str, key: &'static str, key_type: ScalarAttributeType) -> Self {
        Self {
            name: name.to_string(),
            hash_key: (key, key_type),
            range_key: None,
            indexes: Vec::new(),
        }
    }

    /// Every table the service reads or writes
    pub fn all(database: &DatabaseConfig) -> Vec<TableSpec> {
        let mut carts = Self::hash(&database.carts_table_name, "user_id", ScalarAttributeType::N);
        carts.range_key = Some(("menuitem_id", ScalarAttributeType::N));

        let mut orders = Self::hash(&database.orders_table_name, "id", ScalarAttributeType::N);
        orders.indexes = vec![
            (USER_INDEX, "user_id"),
            (DELIVERY_CREW_INDEX, "delivery_crew"),
        ];

        vec![
            Self::hash(&database.categories_table_name, "id", ScalarAttributeType::N),
            Self::hash(&database.category_slugs_table_name, "slug", ScalarAttributeType::S),
            Self::hash(&database.menu_items_table_name, "id", ScalarAttributeType::N),
            carts,
            orders,
            Self::hash(&database.order_items_table_name, "id", ScalarAttributeType::N),
            Self::hash(&database.users_table_name, "id", ScalarAttributeType::N),
            Self::hash(&database.counters_table_name, "name", ScalarAttributeType::S),
        ]
    }
}

fn build_error(what: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::AwsSdk {
        message: format!("Failed to build {}: {}", what, e),
    }
}

fn attribute(name: &str, attribute_type: ScalarAttributeType) -> RepositoryResult<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(attribute_type)
        .build()
        .map_err(|e| build_error("attribute definition", e))
}

fn key(name: &str, key_type: KeyType) -> RepositoryResult<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| build_error("key schema", e))
}

/// Manages DynamoDB table creation and configuration
pub struct TableManager {
    client: Arc<DynamoDbClient>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl TableManager {
    /// Create a new table manager
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(2),
            max_attempts: 150,
        }
    }

    /// Create a table from its spec unless it already exists. Returns true
    /// if the table was created.
    #[instrument(skip(self, spec), fields(table_name = %spec.name))]
    pub async fn create_table(&self, spec: &TableSpec) -> RepositoryResult<bool> {
        if self.table_exists(&spec.name).await? {
            info!("Table {} already exists", spec.name);
            return Ok(false);
        }

        let mut attribute_definitions = vec![attribute(spec.hash_key.0, spec.hash_key.1.clone())?];
        let mut key_schema = vec![key(spec.hash_key.0, KeyType::Hash)?];
        if let Some((range_name, range_type)) = &spec.range_key {
            attribute_definitions.push(attribute(range_name, range_type.clone())?);
            key_schema.push(key(range_name, KeyType::Range)?);
        }

        let mut request = self
            .client
            .create_table()
            .table_name(&spec.name)
            .billing_mode(BillingMode::PayPerRequest);

        for (index_name, index_key) in &spec.indexes {
            attribute_definitions.push(attribute(index_key, ScalarAttributeType::N)?);
            let index = GlobalSecondaryIndex::builder()
                .index_name(*index_name)
                .key_schema(key(index_key, KeyType::Hash)?)
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .build()
                .map_err(|e| build_error("GSI", e))?;
            request = request.global_secondary_indexes(index);
        }

        request
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .send()
            .await
            .map_err(|e| map_dynamodb_error(e.into(), &spec.name))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(&spec.name).await?;
        info!("Table {} created successfully", spec.name);

        Ok(true)
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => match map_dynamodb_error(e.into(), table_name) {
                RepositoryError::TableNotFound { .. } => Ok(false),
                other => {
                    error!("Error checking table existence: {}", other);
                    Err(RepositoryError::ConnectionFailed)
                }
            },
        }
    }

    /// Wait for a table to become active
    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        for _ in 0..self.max_attempts {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), table_name))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        error!("Timeout waiting for table {} to become active", table_name);
        Err(RepositoryError::Timeout)
    }

    /// Create every missing table and return the names of those created
    #[instrument(skip(self, database))]
    pub async fn create_all_tables(&self, database: &DatabaseConfig) -> RepositoryResult<Vec<String>> {
        info!("Creating all tables");

        let mut created = Vec::new();
        for spec in TableSpec::all(database) {
            if self.create_table(&spec).await? {
                created.push(spec.name);
            }
        }

        info!("Created {} tables", created.len());
        Ok(created)
    }
}
