// Repositories module - data access layer

pub(crate) mod dynamo;

pub mod cart_repository;
pub mod category_repository;
pub mod menu_item_repository;
pub mod order_item_repository;
pub mod order_repository;
pub mod sequence;
pub mod table_manager;
pub mod user_repository;

pub use cart_repository::{CartRepository, DynamoDbCartRepository};
pub use category_repository::{CategoryRepository, DynamoDbCategoryRepository};
pub use menu_item_repository::{DynamoDbMenuItemRepository, MenuItemRepository};
pub use order_item_repository::{DynamoDbOrderItemRepository, OrderItemRepository};
pub use order_repository::{DynamoDbOrderRepository, OrderRepository, MAX_ORDER_LINES};
pub use sequence::IdSequence;
pub use table_manager::{TableManager, TableSpec};
pub use user_repository::{DynamoDbUserRepository, UserRepository};
