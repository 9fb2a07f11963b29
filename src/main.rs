use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use restaurant_rs::{
    handlers::{create_app, AdminState, ApiState},
    init_observability,
    observability::Metrics,
    repositories::{
        DynamoDbCartRepository, DynamoDbCategoryRepository, DynamoDbMenuItemRepository,
        DynamoDbOrderItemRepository, DynamoDbOrderRepository, DynamoDbUserRepository, IdSequence,
        TableManager,
    },
    services::{CartService, CatalogService, GroupService, OrderService},
    shutdown_observability, Config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_environment().await?;
    println!("Configuration loaded successfully");

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    info!("Starting restaurant-rs service");
    info!(
        "Service: {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!("Region: {}", config.aws.region);
    for (setting, table) in config.database.table_names() {
        info!("DynamoDB table {}={}", setting, table);
    }

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    let dynamodb_client = Arc::new(config.aws.dynamodb_client.clone());
    let table_manager = Arc::new(TableManager::new(dynamodb_client.clone()));

    let database = &config.database;
    let sequence = IdSequence::new(
        dynamodb_client.clone(),
        database.counters_table_name.clone(),
        database.region.clone(),
    );

    let category_repository = Arc::new(DynamoDbCategoryRepository::new(
        dynamodb_client.clone(),
        database.categories_table_name.clone(),
        database.category_slugs_table_name.clone(),
        database.region.clone(),
        sequence.clone(),
    ));
    let menu_item_repository = Arc::new(DynamoDbMenuItemRepository::new(
        dynamodb_client.clone(),
        database.menu_items_table_name.clone(),
        database.region.clone(),
        sequence.clone(),
    ));
    let cart_repository = Arc::new(DynamoDbCartRepository::new(
        dynamodb_client.clone(),
        database.carts_table_name.clone(),
        database.region.clone(),
    ));
    let order_repository = Arc::new(DynamoDbOrderRepository::new(
        dynamodb_client.clone(),
        database.orders_table_name.clone(),
        database.order_items_table_name.clone(),
        database.carts_table_name.clone(),
        database.region.clone(),
        sequence.clone(),
    ));
    let order_item_repository = Arc::new(DynamoDbOrderItemRepository::new(
        dynamodb_client.clone(),
        database.order_items_table_name.clone(),
        database.region.clone(),
        sequence,
    ));
    let user_repository = Arc::new(DynamoDbUserRepository::new(
        dynamodb_client.clone(),
        database.users_table_name.clone(),
        database.region.clone(),
    ));
    info!("Repositories initialized successfully");

    let catalog_service = Arc::new(CatalogService::new(
        category_repository,
        menu_item_repository.clone(),
    ));
    let cart_service = Arc::new(CartService::new(
        cart_repository.clone(),
        menu_item_repository.clone(),
    ));
    let order_service = Arc::new(OrderService::new(
        order_repository,
        order_item_repository,
        cart_repository,
        menu_item_repository,
    ));
    let group_service = Arc::new(GroupService::new(user_repository));
    info!("Services initialized successfully");

    let api_state = ApiState {
        catalog_service: catalog_service.clone(),
        cart_service,
        order_service,
        group_service: group_service.clone(),
        metrics,
    };
    let admin_state = AdminState {
        catalog_service,
        group_service,
        table_manager,
        database: config.database.clone(),
    };

    let app = create_app(api_state, admin_state, &config.server);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
        shutdown_observability().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
