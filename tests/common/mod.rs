#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use restaurant_rs::{
    config::{DatabaseConfig, ServerConfig},
    handlers::{create_app, AdminState, ApiState},
    models::{
        CartLine, Category, CategoryRequest, MenuItem, MenuItemRequest, Order, OrderDetail,
        OrderDraft, OrderItem, OrderItemRequest, OrderScope, RepositoryError, RepositoryResult,
        Role, User,
    },
    observability::Metrics,
    repositories::{
        CartRepository, CategoryRepository, MenuItemRepository, OrderItemRepository,
        OrderRepository, TableManager, UserRepository,
    },
    services::{CartService, CatalogService, GroupService, OrderService},
};

/// Monotonic id source shared by the in-memory stores
#[derive(Default)]
struct Counter(Mutex<u64>);

impl Counter {
    fn reserve(&self, count: u64) -> u64 {
        let mut next = self.0.lock().unwrap();
        let first = *next + 1;
        *next += count;
        first
    }
}

#[derive(Default)]
pub struct InMemoryCategories {
    rows: Mutex<BTreeMap<u64, Category>>,
    ids: Counter,
}

#[async_trait]
impl CategoryRepository for InMemoryCategories {
    async fn find_all(&self) -> RepositoryResult<Vec<Category>> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Category>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Category>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|category| category.slug == slug)
            .cloned())
    }

    async fn create(&self, request: CategoryRequest) -> RepositoryResult<Category> {
        let mut rows = self.rows.lock().unwrap();
        if rows.values().any(|category| category.slug == request.slug.trim()) {
            return Err(slug_taken(&request.slug));
        }
        let category = Category::new(self.ids.reserve(1), request);
        rows.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, category: Category, _previous_slug: &str) -> RepositoryResult<Category> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&category.id) {
            return Err(RepositoryError::NotFound);
        }
        if rows
            .values()
            .any(|other| other.id != category.id && other.slug == category.slug)
        {
            return Err(slug_taken(&category.slug));
        }
        rows.insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete(&self, id: u64, _slug: &str) -> RepositoryResult<()> {
        self.rows
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

fn slug_taken(slug: &str) -> RepositoryError {
    RepositoryError::ConstraintViolation {
        field: "slug".to_string(),
        message: format!("category with slug '{}' already exists", slug),
    }
}

#[derive(Default)]
pub struct InMemoryMenuItems {
    rows: Mutex<BTreeMap<u64, MenuItem>>,
    ids: Counter,
}

#[async_trait]
impl MenuItemRepository for InMemoryMenuItems {
    async fn find_all(
        &self,
        category_id: Option<u64>,
        price: Option<Decimal>,
    ) -> RepositoryResult<Vec<MenuItem>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.matches(category_id, price))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MenuItem>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn create(&self, request: MenuItemRequest) -> RepositoryResult<MenuItem> {
        let item = MenuItem::new(self.ids.reserve(1), request);
        self.rows.lock().unwrap().insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, item: MenuItem) -> RepositoryResult<MenuItem> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: u64) -> RepositoryResult<()> {
        self.rows
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn exists_in_category(&self, category_id: u64) -> RepositoryResult<bool> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .any(|item| item.category_id == category_id))
    }
}

/// Cart rows keyed by (user, menu item)
#[derive(Default)]
pub struct InMemoryCarts {
    rows: Mutex<BTreeMap<(u64, u64), CartLine>>,
}

impl InMemoryCarts {
    fn take_lines(&self, user_id: u64) -> usize {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(owner, _), _| *owner != user_id);
        before - rows.len()
    }
}

#[async_trait]
impl CartRepository for InMemoryCarts {
    async fn find_lines(&self, user_id: u64) -> RepositoryResult<Vec<CartLine>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|line| line.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_line(&self, line: CartLine) -> RepositoryResult<CartLine> {
        self.rows
            .lock()
            .unwrap()
            .insert((line.user_id, line.menuitem_id), line.clone());
        Ok(line)
    }

    async fn clear(&self, user_id: u64) -> RepositoryResult<usize> {
        Ok(self.take_lines(user_id))
    }
}

/// Orders and order items live together so placement is atomic
#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<BTreeMap<u64, Order>>,
    items: Mutex<BTreeMap<u64, OrderItem>>,
    order_ids: Counter,
    item_ids: Counter,
    carts: Arc<InMemoryCarts>,
    pending_cart_write: Mutex<Option<CartLine>>,
}

impl InMemoryOrders {
    fn new(carts: Arc<InMemoryCarts>) -> Self {
        Self {
            carts,
            ..Default::default()
        }
    }

    /// Assignment has no endpoint; tests set it directly
    pub fn assign_delivery_crew(&self, order_id: u64, crew_id: u64) {
        if let Some(order) = self.orders.lock().unwrap().get_mut(&order_id) {
            order.delivery_crew = Some(crew_id);
        }
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    /// Write `line` to the cart after the next placement has read it
    pub fn change_cart_before_next_placement(&self, line: CartLine) {
        *self.pending_cart_write.lock().unwrap() = Some(line);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn place_order(&self, draft: OrderDraft) -> RepositoryResult<OrderDetail> {
        let pending = self.pending_cart_write.lock().unwrap().take();
        if let Some(line) = pending {
            self.carts.upsert_line(line).await?;
        }

        let mut rows = self.carts.rows.lock().unwrap();
        let unchanged = draft.lines.iter().all(|line| {
            rows.get(&(line.user_id, line.menuitem_id))
                .is_some_and(|row| row.quantity == line.quantity && row.price == line.price)
        });
        if !unchanged {
            return Err(RepositoryError::TransactionFailed {
                message: "ConditionalCheckFailed on a cart row".to_string(),
            });
        }

        let order_id = self.order_ids.reserve(1);
        let first_item_id = self.item_ids.reserve(draft.lines.len() as u64);
        let detail = draft.materialize(order_id, first_item_id);

        self.orders
            .lock()
            .unwrap()
            .insert(order_id, detail.order.clone());
        let mut items = self.items.lock().unwrap();
        for item in &detail.items {
            items.insert(item.id, item.clone());
        }
        for line in &draft.lines {
            rows.remove(&(line.user_id, line.menuitem_id));
        }

        Ok(detail)
    }

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Order>> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    async fn find_orders(&self, scope: OrderScope) -> RepositoryResult<Vec<Order>> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|order| scope.includes(order))
            .cloned()
            .collect())
    }

    async fn set_status(&self, id: u64, status: bool) -> RepositoryResult<Order> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.status = status;
        Ok(order.clone())
    }
}

#[async_trait]
impl OrderItemRepository for InMemoryOrders {
    async fn find_all(&self) -> RepositoryResult<Vec<OrderItem>> {
        Ok(self.items.lock().unwrap().values().cloned().collect())
    }

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<OrderItem>> {
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn create(&self, request: OrderItemRequest) -> RepositoryResult<OrderItem> {
        let item = OrderItem::new(self.item_ids.reserve(1), request);
        self.items.lock().unwrap().insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, item: OrderItem) -> RepositoryResult<OrderItem> {
        let mut items = self.items.lock().unwrap();
        match items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: u64) -> RepositoryResult<()> {
        self.items
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<BTreeMap<u64, User>>,
}

impl InMemoryUsers {
    pub fn groups_of(&self, id: u64) -> BTreeSet<Role> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .map(|user| user.groups.clone())
            .unwrap_or_default()
    }

    fn change_groups(&self, id: u64, change: impl FnOnce(&mut BTreeSet<Role>)) -> RepositoryResult<User> {
        let mut rows = self.rows.lock().unwrap();
        let user = rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        change(&mut user.groups);
        Ok(user.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<User>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_or_register(&self, id: u64, username: &str) -> RepositoryResult<User> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .entry(id)
            .or_insert_with(|| User::new(id, username))
            .clone())
    }

    async fn add_group(&self, id: u64, role: Role) -> RepositoryResult<User> {
        self.change_groups(id, |groups| {
            groups.insert(role);
        })
    }

    async fn remove_group(&self, id: u64, role: Role) -> RepositoryResult<User> {
        self.change_groups(id, |groups| {
            groups.remove(&role);
        })
    }
}

/// Who a test request is sent as
#[derive(Debug, Clone, Copy)]
pub enum As {
    Anonymous,
    User(u64),
    Superuser(u64),
}

pub struct TestEnvironment {
    pub app: Router,
    pub orders: Arc<InMemoryOrders>,
    pub users: Arc<InMemoryUsers>,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let categories = Arc::new(InMemoryCategories::default());
        let menu_items = Arc::new(InMemoryMenuItems::default());
        let carts = Arc::new(InMemoryCarts::default());
        let orders = Arc::new(InMemoryOrders::new(carts.clone()));
        let users = Arc::new(InMemoryUsers::default());

        let catalog_service = Arc::new(CatalogService::new(categories, menu_items.clone()));
        let cart_service = Arc::new(CartService::new(carts.clone(), menu_items.clone()));
        let order_service = Arc::new(OrderService::new(
            orders.clone(),
            orders.clone(),
            carts,
            menu_items,
        ));
        let group_service = Arc::new(GroupService::new(users.clone()));

        let api_state = ApiState {
            catalog_service: catalog_service.clone(),
            cart_service,
            order_service,
            group_service: group_service.clone(),
            metrics: Arc::new(Metrics::new().unwrap()),
        };
        let admin_state = AdminState {
            catalog_service,
            group_service,
            table_manager: Arc::new(TableManager::new(offline_client())),
            database: database_config(),
        };

        let app = create_app(api_state, admin_state, &server_config());
        Self { app, orders, users }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        who: As,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        match who {
            As::Anonymous => {}
            As::User(id) => builder = builder.header("x-user-id", id.to_string()),
            As::Superuser(id) => {
                builder = builder
                    .header("x-user-id", id.to_string())
                    .header("x-user-superuser", "true")
            }
        }

        let request = match body {
            Some(body) => {
                let bytes = serde_json::to_vec(&body).unwrap();
                builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, bytes.len())
                    .body(Body::from(bytes))
                    .unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Send a hand-built request and keep the full response
    pub async fn raw(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, who: As) -> (StatusCode, Value) {
        self.send(Method::GET, uri, who, None).await
    }

    pub async fn post(&self, uri: &str, who: As, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, who, Some(body)).await
    }

    /// Put `user_id` in a group through the admin endpoint
    pub async fn grant(&self, user_id: u64, group: &str) {
        // the user must have been seen once before it can be grouped
        self.get("/cart/", As::User(user_id)).await;
        let (status, _) = self
            .post(
                "/add_user_to_group/",
                As::Superuser(ADMIN),
                serde_json::json!({ "user_id": user_id, "group": group }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Create a category and return its id
    pub async fn category(&self, manager: u64, title: &str, slug: &str) -> u64 {
        let (status, body) = self
            .post(
                "/categories/",
                As::User(manager),
                serde_json::json!({ "title": title, "slug": slug }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_u64().unwrap()
    }

    /// Create a menu item and return its id
    pub async fn menu_item(&self, manager: u64, title: &str, price: &str, category_id: u64) -> u64 {
        let (status, body) = self
            .post(
                "/menu_items/",
                As::User(manager),
                serde_json::json!({
                    "title": title,
                    "price": price,
                    "featured": false,
                    "category_id": category_id
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_u64().unwrap()
    }
}

pub const ADMIN: u64 = 1;

fn offline_client() -> Arc<aws_sdk_dynamodb::Client> {
    let config = aws_sdk_dynamodb::Config::builder()
        .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
        .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
        .build();
    Arc::new(aws_sdk_dynamodb::Client::from_conf(config))
}

fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        request_timeout_seconds: 30,
        max_request_size: 1024 * 1024,
    }
}

fn database_config() -> DatabaseConfig {
    DatabaseConfig {
        categories_table_name: "TestCategories".to_string(),
        category_slugs_table_name: "TestCategorySlugs".to_string(),
        menu_items_table_name: "TestMenuItems".to_string(),
        carts_table_name: "TestCarts".to_string(),
        orders_table_name: "TestOrders".to_string(),
        order_items_table_name: "TestOrderItems".to_string(),
        users_table_name: "TestUsers".to_string(),
        counters_table_name: "TestCounters".to_string(),
        region: "us-east-1".to_string(),
        dynamodb_endpoint: None,
    }
}
