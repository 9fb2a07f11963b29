use async_trait::async_trait;
use aws_sdk_dynamodb::types::{Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamo::{
    dynamodb_span, failed_conditions, get_string, get_u64, map_dynamodb_error, n, s, Item,
};
use super::IdSequence;
use crate::models::{Category, CategoryRequest, RepositoryError, RepositoryResult};

const SEQUENCE_NAME: &str = "categories";

/// Trait defining the interface for category data access operations
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories ordered by id
    async fn find_all(&self) -> RepositoryResult<Vec<Category>>;

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Category>>;

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Category>>;

    /// Create a category. Fails with ConstraintViolation if the slug is taken.
    async fn create(&self, request: CategoryRequest) -> RepositoryResult<Category>;

    /// Replace a category, moving its slug reservation when the slug changes
    async fn update(&self, category: Category, previous_slug: &str) -> RepositoryResult<Category>;

    async fn delete(&self, id: u64, slug: &str) -> RepositoryResult<()>;
}

/// DynamoDB implementation. Slug uniqueness is kept by a second table keyed
/// on `slug`, written in the same transaction as the category.
pub struct DynamoDbCategoryRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    slugs_table_name: String,
    region: String,
    sequence: IdSequence,
}

impl DynamoDbCategoryRepository {
    pub fn new(
        client: Arc<DynamoDbClient>,
        table_name: String,
        slugs_table_name: String,
        region: String,
        sequence: IdSequence,
    ) -> Self {
        Self {
            client,
            table_name,
            slugs_table_name,
            region,
            sequence,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn category_to_item(&self, category: &Category) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), n(category.id));
        item.insert("title".to_string(), s(&category.title));
        item.insert("slug".to_string(), s(&category.slug));
        item
    }

    pub fn item_to_category(&self, item: &Item) -> RepositoryResult<Category> {
        Ok(Category {
            id: get_u64(item, "id")?,
            title: get_string(item, "title")?,
            slug: get_string(item, "slug")?,
        })
    }

    fn slug_item(&self, category: &Category) -> Item {
        let mut item = Item::new();
        item.insert("slug".to_string(), s(&category.slug));
        item.insert("category_id".to_string(), n(category.id));
        item
    }

    fn put_category(&self, category: &Category, condition: &str) -> RepositoryResult<TransactWriteItem> {
        let put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(self.category_to_item(category)))
            .condition_expression(condition)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build put: {}", e),
            })?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn put_slug(&self, category: &Category) -> RepositoryResult<TransactWriteItem> {
        let put = Put::builder()
            .table_name(&self.slugs_table_name)
            .set_item(Some(self.slug_item(category)))
            .condition_expression("attribute_not_exists(slug)")
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build put: {}", e),
            })?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn delete_slug(&self, slug: &str) -> RepositoryResult<TransactWriteItem> {
        let delete = Delete::builder()
            .table_name(&self.slugs_table_name)
            .key("slug", s(slug))
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build delete: {}", e),
            })?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    /// Run a transaction whose action at `slug_index` reserves a slug
    async fn write_with_slug(
        &self,
        actions: Vec<TransactWriteItem>,
        slug_index: Option<usize>,
        slug: &str,
    ) -> RepositoryResult<()> {
        let span = dynamodb_span("TransactWriteItems", &self.table_name, &self.region);
        async {
            match self
                .client
                .transact_write_items()
                .set_transact_items(Some(actions))
                .send()
                .await
            {
                Ok(_) => Ok(()),
                Err(e) => {
                    let error: DynamoDbError = e.into();
                    let failed = failed_conditions(&error);
                    if slug_index.map_or(false, |index| failed.contains(&index)) {
                        warn!(slug = %slug, "Category slug already in use");
                        return Err(RepositoryError::ConstraintViolation {
                            field: "slug".to_string(),
                            message: format!("category with slug '{}' already exists", slug),
                        });
                    }
                    if failed.contains(&0) {
                        return Err(RepositoryError::NotFound);
                    }
                    Err(map_dynamodb_error(error, &self.table_name))
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl CategoryRepository for DynamoDbCategoryRepository {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<Category>> {
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

        let mut categories = Vec::with_capacity(items.len());
        for item in &items {
            match self.item_to_category(item) {
                Ok(category) => categories.push(category),
                Err(e) => warn!("Failed to parse category item: {}", e),
            }
        }
        categories.sort_by_key(|category| category.id);

        info!("Found {} categories", categories.len());
        Ok(categories)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id))]
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Category>> {
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
            .map(|item| self.item_to_category(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.slugs_table_name, slug = %slug))]
    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Category>> {
        let span = dynamodb_span("GetItem", &self.slugs_table_name, &self.region);
        let response = async {
            self.client
                .get_item()
                .table_name(&self.slugs_table_name)
                .key("slug", s(slug))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.slugs_table_name))
        }
        .instrument(span)
        .await?;

        match response.item {
            Some(item) => self.find_by_id(get_u64(&item, "category_id")?).await,
            None => Ok(None),
        }
    }

    #[instrument(skip(self, request), fields(table = %self.table_name, slug = %request.slug))]
    async fn create(&self, request: CategoryRequest) -> RepositoryResult<Category> {
        let id = self.sequence.next(SEQUENCE_NAME).await?;
        let category = Category::new(id, request);

        let actions = vec![
            self.put_category(&category, "attribute_not_exists(id)")?,
            self.put_slug(&category)?,
        ];
        self.write_with_slug(actions, Some(1), &category.slug).await?;

        info!(id = category.id, "Category created");
        Ok(category)
    }

    #[instrument(skip(self, category), fields(table = %self.table_name, id = category.id))]
    async fn update(&self, category: Category, previous_slug: &str) -> RepositoryResult<Category> {
        let mut actions = vec![self.put_category(&category, "attribute_exists(id)")?];
        let slug_index = if category.slug != previous_slug {
            actions.push(self.put_slug(&category)?);
            actions.push(self.delete_slug(previous_slug)?);
            Some(1)
        } else {
            None
        };
        self.write_with_slug(actions, slug_index, &category.slug).await?;

        info!("Category updated");
        Ok(category)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id))]
    async fn delete(&self, id: u64, slug: &str) -> RepositoryResult<()> {
        let delete = Delete::builder()
            .table_name(&self.table_name)
            .key("id", n(id))
            .condition_expression("attribute_exists(id)")
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build delete: {}", e),
            })?;
        let actions = vec![
            TransactWriteItem::builder().delete(delete).build(),
            self.delete_slug(slug)?,
        ];
        self.write_with_slug(actions, None, slug).await?;

        info!("Category deleted");
        Ok(())
    }
}
