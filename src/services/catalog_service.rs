use std::sync::Arc;
use tracing::instrument;

use super::access_control::{
    can_manage_catalog, ensure, CATEGORY_CREATE_DENIED, CATEGORY_DELETE_DENIED,
    CATEGORY_UPDATE_DENIED, NOT_AUTHORIZED,
};
use crate::models::{
    Caller, Category, CategoryRequest, MenuItem, MenuItemFilters, MenuItemRequest,
    RepositoryError, ServiceError, ServiceResult, UpdateMenuItemRequest, Validate,
    ValidationError,
};
use crate::repositories::{CategoryRepository, MenuItemRepository};

/// Categories and menu items
pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    menu_items: Arc<dyn MenuItemRepository>,
}

impl CatalogService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        menu_items: Arc<dyn MenuItemRepository>,
    ) -> Self {
        Self {
            categories,
            menu_items,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> ServiceResult<Vec<Category>> {
        let categories = self.categories.find_all().await?;
        crate::info_with_trace!("Found {} categories", categories.len());
        Ok(categories)
    }

    #[instrument(skip(self), fields(category_id = id))]
    pub async fn get_category(&self, id: u64) -> ServiceResult<Category> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::CategoryNotFound { id })
    }

    #[instrument(skip(self, caller, request), fields(user_id = caller.user_id, slug = %request.slug))]
    pub async fn create_category(
        &self,
        caller: &Caller,
        request: CategoryRequest,
    ) -> ServiceResult<Category> {
        ensure(can_manage_catalog(caller), CATEGORY_CREATE_DENIED)?;
        request.validate()?;

        let category = self.categories.create(request).await?;
        crate::info_with_trace!(category_id = category.id, "Category created");
        Ok(category)
    }

    /// Missing categories are reported before the role check
    #[instrument(skip(self, caller, request), fields(user_id = caller.user_id, category_id = id))]
    pub async fn update_category(
        &self,
        caller: &Caller,
        id: u64,
        request: CategoryRequest,
    ) -> ServiceResult<Category> {
        let mut category = self.get_category(id).await?;
        ensure(can_manage_catalog(caller), CATEGORY_UPDATE_DENIED)?;
        request.validate()?;

        let previous_slug = category.slug.clone();
        category.apply(request);
        let updated = self.categories.update(category, &previous_slug).await?;

        crate::info_with_trace!("Category updated");
        Ok(updated)
    }

    /// Categories still referenced by a menu item cannot be deleted
    #[instrument(skip(self, caller), fields(user_id = caller.user_id, category_id = id))]
    pub async fn delete_category(&self, caller: &Caller, id: u64) -> ServiceResult<()> {
        let category = self.get_category(id).await?;
        ensure(can_manage_catalog(caller), CATEGORY_DELETE_DENIED)?;

        if self.menu_items.exists_in_category(id).await? {
            crate::warn_with_trace!("Refusing to delete category in use");
            return Err(ServiceError::invalid_state(format!(
                "Category {} is still used by menu items",
                category.slug
            )));
        }

        self.categories.delete(id, &category.slug).await?;
        crate::info_with_trace!("Category deleted");
        Ok(())
    }

    /// Menu items in id order. An unknown category slug matches nothing.
    #[instrument(skip(self), fields(filters = ?filters))]
    pub async fn list_menu_items(&self, filters: MenuItemFilters) -> ServiceResult<Vec<MenuItem>> {
        let category_id = match filters.category.as_deref() {
            Some(slug) => match self.categories.find_by_slug(slug).await? {
                Some(category) => Some(category.id),
                None => {
                    crate::info_with_trace!("No category with slug {}", slug);
                    return Ok(Vec::new());
                }
            },
            None => None,
        };

        let items = self.menu_items.find_all(category_id, filters.price).await?;
        crate::info_with_trace!("Found {} menu items", items.len());
        Ok(items)
    }

    #[instrument(skip(self, caller, request), fields(user_id = caller.user_id, title = %request.title))]
    pub async fn create_menu_item(
        &self,
        caller: &Caller,
        request: MenuItemRequest,
    ) -> ServiceResult<MenuItem> {
        ensure(can_manage_catalog(caller), NOT_AUTHORIZED)?;
        request.validate()?;
        self.require_category(request.category_id).await?;

        let item = self.menu_items.create(request).await?;
        crate::info_with_trace!(menu_item_id = item.id, "Menu item created");
        Ok(item)
    }

    #[instrument(skip(self, caller, request), fields(user_id = caller.user_id, menu_item_id = request.id))]
    pub async fn update_menu_item(
        &self,
        caller: &Caller,
        request: UpdateMenuItemRequest,
    ) -> ServiceResult<MenuItem> {
        ensure(can_manage_catalog(caller), NOT_AUTHORIZED)?;

        let (id, request) = request.into_parts();
        request.validate()?;
        if self.menu_items.find_by_id(id).await?.is_none() {
            return Err(ServiceError::MenuItemNotFound { id });
        }
        self.require_category(request.category_id).await?;

        let updated = self
            .menu_items
            .update(MenuItem::new(id, request))
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::MenuItemNotFound { id },
                other => other.into(),
            })?;

        crate::info_with_trace!("Menu item updated");
        Ok(updated)
    }

    #[instrument(skip(self, caller), fields(user_id = caller.user_id, menu_item_id = id))]
    pub async fn delete_menu_item(&self, caller: &Caller, id: u64) -> ServiceResult<()> {
        ensure(can_manage_catalog(caller), NOT_AUTHORIZED)?;

        self.menu_items.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::MenuItemNotFound { id },
            other => other.into(),
        })?;

        crate::info_with_trace!("Menu item deleted");
        Ok(())
    }

    async fn require_category(&self, category_id: u64) -> ServiceResult<()> {
        match self.categories.find_by_id(category_id).await? {
            Some(_) => Ok(()),
            None => Err(ValidationError::UnknownReference {
                field: "category_id".to_string(),
                value: category_id.to_string(),
            }
            .into()),
        }
    }
}
