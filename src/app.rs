use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::api::signals::SignalHub;
use crate::config::AppConfig;
use crate::logic::coordinator::ModalCoordinator;
use crate::repository::{HandlerRegistry, UploadRepository};
use crate::store::{
    ActorSource, Backend, DataService, LocalActorStore, LookupCache, MemoryDataService,
    RestDataService, StorageService, UserDirectory,
};

/// Application root. Everything shared between requests is built here once.
pub struct CatalogApp {
    pub coordinator: ModalCoordinator,
    pub lookups: LookupCache,
    pub signals: Arc<SignalHub>,
}

impl CatalogApp {
    pub fn new<B: Backend + 'static>(
        backend: Arc<B>,
        actors: Arc<dyn ActorSource>,
        bucket: &str,
        lookup_ttl: Duration,
        lookup_timeout: Duration,
    ) -> Self {
        let data: Arc<dyn DataService> = backend.clone();
        let storage: Arc<dyn StorageService> = backend;

        let uploads = Arc::new(UploadRepository::new(storage, bucket));
        let registry = Arc::new(HandlerRegistry::with_all_kinds(data.clone(), uploads));
        let signals = Arc::new(SignalHub::new());
        let coordinator = ModalCoordinator::new(registry, actors, signals.clone());
        let lookups = LookupCache::with_limits(
            Arc::new(UserDirectory::new(data)),
            lookup_ttl,
            lookup_timeout,
        );

        Self {
            coordinator,
            lookups,
            signals,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let actors: Arc<dyn ActorSource> = Arc::new(LocalActorStore::new(&config.auth.actor));

        match config.backend.url.as_deref().filter(|_| !config.is_demo()) {
            Some(url) => {
                info!("Using data service at {}", url);
                let backend = RestDataService::new(url, config.backend.key.clone(), config.request_timeout())?;
                Ok(Self::new(
                    Arc::new(backend),
                    actors,
                    &config.storage.bucket,
                    config.lookup_ttl(),
                    config.lookup_timeout(),
                ))
            }
            None => {
                warn!("No backend url configured; running in demo mode on fallback data");
                Ok(Self::new(
                    Arc::new(MemoryDataService::new()),
                    actors,
                    &config.storage.bucket,
                    config.lookup_ttl(),
                    config.lookup_timeout(),
                ))
            }
        }
    }
}
