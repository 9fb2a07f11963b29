use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    AddToCartRequest, Caller, CartLine, CartResponse, ServiceError, ServiceResult, Validate,
};
use crate::repositories::{CartRepository, MenuItemRepository};

/// Each caller's cart. Callers only ever touch their own rows.
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    menu_items: Arc<dyn MenuItemRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, menu_items: Arc<dyn MenuItemRepository>) -> Self {
        Self { carts, menu_items }
    }

    /// Write the caller's row for the menu item at its current price. A
    /// second add for the same item replaces the row.
    #[instrument(skip(self, caller), fields(user_id = caller.user_id, menuitem_id = request.menuitem_id, quantity = request.quantity))]
    pub async fn add_to_cart(
        &self,
        caller: &Caller,
        request: AddToCartRequest,
    ) -> ServiceResult<CartLine> {
        request.validate()?;

        let menu_item = self
            .menu_items
            .find_by_id(request.menuitem_id)
            .await?
            .ok_or(ServiceError::MenuItemNotFound {
                id: request.menuitem_id,
            })?;

        let line = CartLine::new(caller.user_id, &menu_item, request.quantity);
        let line = self.carts.upsert_line(line).await?;

        crate::info_with_trace!(price = %line.price, "Cart row written");
        Ok(line)
    }

    #[instrument(skip(self, caller), fields(user_id = caller.user_id))]
    pub async fn view_cart(&self, caller: &Caller) -> ServiceResult<CartResponse> {
        let lines = self.carts.find_lines(caller.user_id).await?;
        Ok(CartResponse::from_lines(caller.user_id, lines))
    }

    /// Remove every row of the caller's cart; an empty cart is not an error
    #[instrument(skip(self, caller), fields(user_id = caller.user_id))]
    pub async fn flush_cart(&self, caller: &Caller) -> ServiceResult<()> {
        let removed = self.carts.clear(caller.user_id).await?;
        crate::info_with_trace!("Flushed {} cart rows", removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MenuItem, User};
    use crate::services::mocks::{MockTestCartRepository, MockTestMenuItemRepository};
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    fn customer() -> Caller {
        Caller::from_user(&User::new(42, "customer"), false)
    }

    fn pasta() -> MenuItem {
        MenuItem {
            id: 5,
            title: "Pasta".to_string(),
            price: dec!(10.00),
            featured: false,
            category_id: 3,
        }
    }

    #[tokio::test]
    async fn test_add_to_cart_snapshots_price() {
        let mut menu_items = MockTestMenuItemRepository::new();
        menu_items
            .expect_find_by_id()
            .with(eq(5))
            .returning(|_| Ok(Some(pasta())));

        let mut carts = MockTestCartRepository::new();
        carts
            .expect_upsert_line()
            .withf(|line| line.user_id == 42 && line.quantity == 2)
            .times(1)
            .returning(Ok);

        let service = CartService::new(Arc::new(carts), Arc::new(menu_items));
        let line = service
            .add_to_cart(
                &customer(),
                AddToCartRequest {
                    menuitem_id: 5,
                    quantity: 2,
                },
            )
            .await
            .unwrap();

        assert_eq!(line.unit_price, dec!(10.00));
        assert_eq!(line.price, dec!(20.00));
    }

    #[tokio::test]
    async fn test_add_unknown_item_is_not_found() {
        let mut menu_items = MockTestMenuItemRepository::new();
        menu_items.expect_find_by_id().returning(|_| Ok(None));
        let mut carts = MockTestCartRepository::new();
        carts.expect_upsert_line().never();

        let service = CartService::new(Arc::new(carts), Arc::new(menu_items));
        let result = service
            .add_to_cart(
                &customer(),
                AddToCartRequest {
                    menuitem_id: 404,
                    quantity: 1,
                },
            )
            .await;

        assert!(matches!(result, Err(ServiceError::MenuItemNotFound { id: 404 })));
    }

    #[tokio::test]
    async fn test_add_zero_quantity_is_invalid() {
        let mut menu_items = MockTestMenuItemRepository::new();
        menu_items.expect_find_by_id().never();

        let service = CartService::new(Arc::new(MockTestCartRepository::new()), Arc::new(menu_items));
        let result = service
            .add_to_cart(
                &customer(),
                AddToCartRequest {
                    menuitem_id: 5,
                    quantity: 0,
                },
            )
            .await;

        match result {
            Err(ServiceError::ValidationError { field, .. }) => assert_eq!(field, "quantity"),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_flush_empty_cart_succeeds() {
        let mut carts = MockTestCartRepository::new();
        carts.expect_clear().with(eq(42)).times(1).returning(|_| Ok(0));

        let service = CartService::new(Arc::new(carts), Arc::new(MockTestMenuItemRepository::new()));
        assert!(service.flush_cart(&customer()).await.is_ok());
    }

    #[tokio::test]
    async fn test_view_cart_totals() {
        let mut carts = MockTestCartRepository::new();
        carts.expect_find_lines().with(eq(42)).returning(|user_id| {
            Ok(vec![CartLine::new(user_id, &pasta(), 3)])
        });

        let service = CartService::new(Arc::new(carts), Arc::new(MockTestMenuItemRepository::new()));
        let cart = service.view_cart(&customer()).await.unwrap();

        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.total_price, dec!(30.00));
    }
}
