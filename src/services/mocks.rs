//! mockall doubles of the repository traits, shared by the service tests

use async_trait::async_trait;
use mockall::mock;
use rust_decimal::Decimal;

use crate::models::{
    CartLine, Category, CategoryRequest, MenuItem, MenuItemRequest, Order, OrderDetail, OrderDraft,
    OrderItem, OrderItemRequest, OrderScope, RepositoryError, Role, User,
};
use crate::repositories::{
    CartRepository, CategoryRepository, MenuItemRepository, OrderItemRepository, OrderRepository,
    UserRepository,
};

mock! {
    pub TestCategoryRepository {}

    #[async_trait]
    impl CategoryRepository for TestCategoryRepository {
        async fn find_all(&self) -> Result<Vec<Category>, RepositoryError>;
        async fn find_by_id(&self, id: u64) -> Result<Option<Category>, RepositoryError>;
        async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError>;
        async fn create(&self, request: CategoryRequest) -> Result<Category, RepositoryError>;
        async fn update(&self, category: Category, previous_slug: &str) -> Result<Category, RepositoryError>;
        async fn delete(&self, id: u64, slug: &str) -> Result<(), RepositoryError>;
    }
}

mock! {
    pub TestMenuItemRepository {}

    #[async_trait]
    impl MenuItemRepository for TestMenuItemRepository {
        async fn find_all(&self, category_id: Option<u64>, price: Option<Decimal>) -> Result<Vec<MenuItem>, RepositoryError>;
        async fn find_by_id(&self, id: u64) -> Result<Option<MenuItem>, RepositoryError>;
        async fn create(&self, request: MenuItemRequest) -> Result<MenuItem, RepositoryError>;
        async fn update(&self, item: MenuItem) -> Result<MenuItem, RepositoryError>;
        async fn delete(&self, id: u64) -> Result<(), RepositoryError>;
        async fn exists_in_category(&self, category_id: u64) -> Result<bool, RepositoryError>;
    }
}

mock! {
    pub TestCartRepository {}

    #[async_trait]
    impl CartRepository for TestCartRepository {
        async fn find_lines(&self, user_id: u64) -> Result<Vec<CartLine>, RepositoryError>;
        async fn upsert_line(&self, line: CartLine) -> Result<CartLine, RepositoryError>;
        async fn clear(&self, user_id: u64) -> Result<usize, RepositoryError>;
    }
}

mock! {
    pub TestOrderRepository {}

    #[async_trait]
    impl OrderRepository for TestOrderRepository {
        async fn place_order(&self, draft: OrderDraft) -> Result<OrderDetail, RepositoryError>;
        async fn find_by_id(&self, id: u64) -> Result<Option<Order>, RepositoryError>;
        async fn find_orders(&self, scope: OrderScope) -> Result<Vec<Order>, RepositoryError>;
        async fn set_status(&self, id: u64, status: bool) -> Result<Order, RepositoryError>;
    }
}

mock! {
    pub TestOrderItemRepository {}

    #[async_trait]
    impl OrderItemRepository for TestOrderItemRepository {
        async fn find_all(&self) -> Result<Vec<OrderItem>, RepositoryError>;
        async fn find_by_id(&self, id: u64) -> Result<Option<OrderItem>, RepositoryError>;
        async fn create(&self, request: OrderItemRequest) -> Result<OrderItem, RepositoryError>;
        async fn update(&self, item: OrderItem) -> Result<OrderItem, RepositoryError>;
        async fn delete(&self, id: u64) -> Result<(), RepositoryError>;
    }
}

mock! {
    pub TestUserRepository {}

    #[async_trait]
    impl UserRepository for TestUserRepository {
        async fn find_by_id(&self, id: u64) -> Result<Option<User>, RepositoryError>;
        async fn find_or_register(&self, id: u64, username: &str) -> Result<User, RepositoryError>;
        async fn add_group(&self, id: u64, role: Role) -> Result<User, RepositoryError>;
        async fn remove_group(&self, id: u64, role: Role) -> Result<User, RepositoryError>;
    }
}
