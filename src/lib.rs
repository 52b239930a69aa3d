pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{ServiceError, ServiceResult};
pub use logic::{
    EntityValidator, FieldViolation, TestDefinitionValidator, TestDefinitionsService,
    ValidationError, IMMUTABLE_AFTER_CREATE,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{
    build_external_connection, AnnotationTagStore, ExternalConnection, ExternalCredentials,
    MemoryStore, PostgresStore, Store, TestDefinitionStore, TlsPolicy,
};

use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};

/// Build the store selected by `config` and serve the HTTP API until shutdown
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    match config.database.backend {
        StoreBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let store = PostgresStore::new(&config.database_url(), config.max_connections()).await?;
            log::info!("Database ready");
            serve(Arc::new(store), &config).await
        }
        StoreBackend::Memory => {
            log::warn!("Using in-memory store; data is lost on restart");
            serve(Arc::new(MemoryStore::new()), &config).await
        }
    }
}

async fn serve<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    let service = Arc::new(TestDefinitionsService::new(store.clone(), store));
    let app = routes::create_router::<S>().with_state(service);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Evaluation registry running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
