pub mod api;
pub mod app;
pub mod config;
pub mod logic;
pub mod model;
pub mod repository;
pub mod store;

pub use api::routes;
pub use app::CatalogApp;

// Export logic types
pub use logic::{
    ChangeNotifier, CoordinatorError, FieldMapper, IdentityError, IdentityValidator,
    ModalCoordinator, ModalSnapshot, ModalState, SaveEvent, Signal, ValidationError,
};

// Export all model types
pub use model::*;

pub use repository::{HandlerRegistry, KindHandler, RepositoryError, SavedRecord};
pub use store::{BackendError, DataService, LookupCache, MemoryDataService, RestDataService};

/// Build the application from configuration and serve it until shutdown
pub async fn run_server(config: crate::config::AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    let app = Arc::new(CatalogApp::from_config(&config)?);
    let router = routes::create_router_with_assets(config.server.assets.as_deref()).with_state(app);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Catalog admin running on http://{}", bind_address);

    serve(listener, router).await?;

    Ok(())
}
