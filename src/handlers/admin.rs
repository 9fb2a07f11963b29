use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

use super::api::{error_body, service_error_to_response, ApiError};
use crate::config::DatabaseConfig;
use crate::models::{Caller, CategoryRequest, MenuItemRequest, Role};
use crate::repositories::TableManager;
use crate::services::access_control::{can_run_admin_tasks, ensure, NOT_AUTHORIZED};
use crate::services::{CatalogService, GroupService};

/// Admin state containing services
#[derive(Clone)]
pub struct AdminState {
    pub catalog_service: Arc<CatalogService>,
    pub group_service: Arc<GroupService>,
    pub table_manager: Arc<TableManager>,
    pub database: DatabaseConfig,
}

impl FromRef<AdminState> for Arc<GroupService> {
    fn from_ref(state: &AdminState) -> Self {
        state.group_service.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct SetupTablesResponse {
    pub message: String,
    pub tables_created: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub categories_created: usize,
    pub menu_items_created: usize,
    pub categories_skipped: usize,
    pub timestamp: String,
}

struct SeedCategory {
    title: &'static str,
    slug: &'static str,
    items: Vec<(&'static str, Decimal, bool)>,
}

fn sample_menu() -> Vec<SeedCategory> {
    vec![
        SeedCategory {
            title: "Starters",
            slug: "starters",
            items: vec![
                ("Bruschetta", dec!(6.50), true),
                ("Greek Salad", dec!(8.00), false),
            ],
        },
        SeedCategory {
            title: "Mains",
            slug: "mains",
            items: vec![
                ("Lemon Chicken", dec!(15.25), true),
                ("Grilled Fish", dec!(18.00), false),
                ("Pasta Primavera", dec!(12.75), false),
            ],
        },
        SeedCategory {
            title: "Desserts",
            slug: "desserts",
            items: vec![("Lemon Cake", dec!(5.50), false), ("Baklava", dec!(4.75), true)],
        },
    ]
}

pub fn create_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/admin/setup-tables", post(setup_tables))
        .route("/api/admin/seed", post(seed_database))
        .with_state(state)
}

fn require_admin(caller: &Caller) -> Result<(), ApiError> {
    ensure(can_run_admin_tasks(caller), NOT_AUTHORIZED).map_err(service_error_to_response)
}

/// Create any missing DynamoDB tables
#[instrument(name = "setup_tables", skip(state, caller), fields(user_id = caller.user_id))]
pub async fn setup_tables(
    State(state): State<AdminState>,
    caller: Caller,
) -> Result<Json<SetupTablesResponse>, ApiError> {
    require_admin(&caller)?;

    let tables_created = state
        .table_manager
        .create_all_tables(&state.database)
        .await
        .map_err(|err| {
            crate::error_with_trace!("Failed to create tables: {}", err);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create tables: {}", err),
                None,
            )
        })?;

    info!("Created tables: {:?}", tables_created);
    Ok(Json(SetupTablesResponse {
        message: format!("Created {} tables", tables_created.len()),
        tables_created,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Load a sample menu. Categories whose slug already exists are left alone
/// together with their items, so seeding twice adds nothing.
#[instrument(name = "seed_database", skip(state, caller), fields(user_id = caller.user_id))]
pub async fn seed_database(
    State(state): State<AdminState>,
    caller: Caller,
) -> Result<Json<SeedResponse>, ApiError> {
    require_admin(&caller)?;

    let seeder = Caller {
        roles: BTreeSet::from([Role::Manager]),
        ..caller
    };
    let catalog = &state.catalog_service;

    let existing: BTreeSet<String> = catalog
        .list_categories()
        .await
        .map_err(service_error_to_response)?
        .into_iter()
        .map(|category| category.slug)
        .collect();

    let mut categories_created = 0;
    let mut categories_skipped = 0;
    let mut menu_items_created = 0;

    for seed in sample_menu() {
        if existing.contains(seed.slug) {
            categories_skipped += 1;
            continue;
        }

        let category = catalog
            .create_category(
                &seeder,
                CategoryRequest {
                    title: seed.title.to_string(),
                    slug: seed.slug.to_string(),
                },
            )
            .await
            .map_err(service_error_to_response)?;
        categories_created += 1;

        for (title, price, featured) in seed.items {
            catalog
                .create_menu_item(
                    &seeder,
                    MenuItemRequest {
                        title: title.to_string(),
                        price,
                        featured,
                        category_id: category.id,
                    },
                )
                .await
                .map_err(service_error_to_response)?;
            menu_items_created += 1;
        }
    }

    info!(
        categories_created,
        menu_items_created, categories_skipped, "Database seeded"
    );
    Ok(Json(SeedResponse {
        message: format!(
            "Seeded {} categories and {} menu items",
            categories_created, menu_items_created
        ),
        categories_created,
        menu_items_created,
        categories_skipped,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
