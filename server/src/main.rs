//! sdbsync server binary.
//!
//! Serves the demo `/clients` resource over the configured attribute store.

use sdbsync_engine::{AttrType, AttributeDef, Declaration, Schema};
use sdbsync_server::{
    app, db, AppState, AttributeStore, Config, DomainRegistry, MemoryStore, PgStore, StoreBackend,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Schema of the demo clients domain.
fn clients_schema() -> Schema {
    Schema::new()
        .with_attribute("firstName", AttrType::String)
        .with_attribute("lastName", AttrType::String)
        .with_attribute("middleInitial", AttributeDef::string().max_length(1))
        .with_attribute("age", AttributeDef::number().min(18).length(3))
        .with_attribute("favoriteColors", Declaration::array_of(AttrType::String))
        .with_attribute(
            "latitude",
            AttributeDef::number().min(-90).max(90).precision(6),
        )
        .with_attribute(
            "longitude",
            AttributeDef::number().min(-180).max(180).precision(6),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sdbsync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting sdbsync server on {}:{} with {} store",
        config.host,
        config.port,
        config.store_backend
    );

    let store: Arc<dyn AttributeStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(MemoryStore::with_page_size(config.page_size)),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(sdbsync_server::config::ConfigError::MissingDatabaseUrl)?;
            let pool = db::create_pool(url, 10).await?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            Arc::new(PgStore::with_page_size(pool, config.page_size))
        }
    };

    let registry = DomainRegistry::new_shared();
    registry.register_url("/clients", clients_schema());

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(store, registry, config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
