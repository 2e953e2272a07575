//! sdbsync server - typed records over an attribute store.
//!
//! This crate provides the sync layer that saves, fetches, destroys and
//! queries records through an [`AttributeStore`], two store backends, and a
//! REST surface for record-binding clients.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod store;
pub mod sync;

pub use crate::config::{Config, StoreBackend};
pub use crate::registry::DomainRegistry;
pub use crate::store::{AttributeStore, MemoryStore, PgStore};
pub use crate::sync::{SaveOutcome, SyncError, Syncer, UnsetOutcome};

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub syncer: Arc<Syncer>,
    pub registry: Arc<DomainRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AttributeStore>,
        registry: Arc<DomainRegistry>,
        config: Config,
    ) -> Self {
        Self {
            syncer: Arc::new(Syncer::new(store)),
            registry,
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
