// Services module - business logic layer

pub mod access_control;
pub mod cart_service;
pub mod catalog_service;
pub mod group_service;
pub mod order_service;

#[cfg(test)]
pub(crate) mod mocks;

pub use cart_service::CartService;
pub use catalog_service::CatalogService;
pub use group_service::GroupService;
pub use order_service::OrderService;
