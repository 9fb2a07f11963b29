use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamo::{
    dynamodb_span, get_string, get_string_set, get_u64, map_dynamodb_error, n, s, Item,
};
use crate::models::{RepositoryError, RepositoryResult, Role, User};

/// Trait defining the interface for user data access operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<User>>;

    /// Return the stored user, creating a record with no groups on first sight
    async fn find_or_register(&self, id: u64, username: &str) -> RepositoryResult<User>;

    /// Add a group to an existing user. Fails with NotFound if there is no such user.
    async fn add_group(&self, id: u64, role: Role) -> RepositoryResult<User>;

    /// Remove a group from an existing user. Fails with NotFound if there is no such user.
    async fn remove_group(&self, id: u64, role: Role) -> RepositoryResult<User>;
}

/// DynamoDB implementation storing groups as a string set
pub struct DynamoDbUserRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbUserRepository {
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

    pub fn user_to_item(&self, user: &User) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), n(user.id));
        item.insert("username".to_string(), s(&user.username));
        if !user.groups.is_empty() {
            // DynamoDB rejects empty sets
            item.insert(
                "groups".to_string(),
                AttributeValue::Ss(user.groups.iter().map(|g| g.to_string()).collect()),
            );
        }
        item
    }

    pub fn item_to_user(&self, item: &Item) -> RepositoryResult<User> {
        let mut groups = std::collections::BTreeSet::new();
        for name in get_string_set(item, "groups") {
            match name.parse::<Role>() {
                Ok(role) => {
                    groups.insert(role);
                }
                Err(e) => warn!("Ignoring stored group: {}", e),
            }
        }

        Ok(User {
            id: get_u64(item, "id")?,
            username: get_string(item, "username").unwrap_or_default(),
            groups,
        })
    }

    async fn update_groups(&self, id: u64, action: &str, role: Role) -> RepositoryResult<User> {
        let span = dynamodb_span("UpdateItem", &self.table_name, &self.region);
        let response = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key("id", n(id))
                .update_expression(format!("{} #groups :group", action))
                .condition_expression("attribute_exists(id)")
                .expression_attribute_names("#groups", "groups")
                .expression_attribute_values(":group", AttributeValue::Ss(vec![role.to_string()]))
                .return_values(ReturnValue::AllNew)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        let attributes = response.attributes.ok_or(RepositoryError::NotFound)?;
        self.item_to_user(&attributes)
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[instrument(skip(self), fields(table = %self.table_name, id = id))]
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<User>> {
        let span = dynamodb_span("GetItem", &self.table_name, &self.region);
        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("id", n(id))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await?;

        response
            .item
            .map(|item| self.item_to_user(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id))]
    async fn find_or_register(&self, id: u64, username: &str) -> RepositoryResult<User> {
        if let Some(user) = self.find_by_id(id).await? {
            return Ok(user);
        }

        let user = User::new(id, username);
        let span = dynamodb_span("PutItem", &self.table_name, &self.region);
        let result = async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(self.user_to_item(&user)))
                .condition_expression("attribute_not_exists(id)")
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(span)
        .await;

        match result {
            Ok(_) => {
                info!("Registered new user");
                Ok(user)
            }
            // registered concurrently by another request
            Err(RepositoryError::NotFound) => self
                .find_by_id(id)
                .await?
                .ok_or(RepositoryError::NotFound),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id, group = %role))]
    async fn add_group(&self, id: u64, role: Role) -> RepositoryResult<User> {
        let user = self.update_groups(id, "ADD", role).await?;
        info!("User added to group");
        Ok(user)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = id, group = %role))]
    async fn remove_group(&self, id: u64, role: Role) -> RepositoryResult<User> {
        let user = self.update_groups(id, "DELETE", role).await?;
        info!("User removed from group");
        Ok(user)
    }
}
