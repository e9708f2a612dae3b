//! Shared application state for the heatmap server.
//!
//! [`AppState`] holds the loaded configuration, a [`DataSource`] over
//! the configured place store, and the loader for the mapping script.
//! The store is a closed set of backends dispatched through
//! [`PlaceBackend`].

use std::sync::Arc;

use vibemap_core::config::VibemapConfig;
use vibemap_core::error::StoreError;
use vibemap_core::loader::{LoadFuture, ResourceLoader, ScriptSource, maps_script};
use vibemap_core::source::{DataSource, Normalizer};
use vibemap_core::store::{MemoryPlaceStore, PlaceStore, RawPlace};
use vibemap_db::PgPlaceStore;
use vibemap_types::PlaceId;

/// The place store selected at startup.
#[derive(Debug)]
pub enum PlaceBackend {
    /// Documents held in process memory (seed file or empty).
    Memory(MemoryPlaceStore),
    /// Documents in `PostgreSQL`.
    Postgres(PgPlaceStore),
}

impl PlaceBackend {
    /// Short name for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl PlaceStore for PlaceBackend {
    async fn places_in(&self, location_key: &str) -> Result<Vec<RawPlace>, StoreError> {
        match self {
            Self::Memory(store) => store.places_in(location_key).await,
            Self::Postgres(store) => store.places_in(location_key).await,
        }
    }

    async fn place_by_id(&self, id: &PlaceId) -> Result<Option<RawPlace>, StoreError> {
        match self {
            Self::Memory(store) => store.place_by_id(id).await,
            Self::Postgres(store) => store.place_by_id(id).await,
        }
    }
}

/// Shared state for all request handlers and view sessions.
#[derive(Debug)]
pub struct AppState {
    /// Loaded configuration.
    pub config: VibemapConfig,
    /// Normalizing, stale-aware access to the place store.
    pub source: DataSource<PlaceBackend>,
    loader: &'static ResourceLoader,
}

impl AppState {
    /// Create state over `store` using the process-wide mapping script loader.
    pub fn new(config: VibemapConfig, store: PlaceBackend) -> Self {
        Self::with_loader(config, store, maps_script())
    }

    /// Create state with an explicit script loader.
    pub fn with_loader(
        config: VibemapConfig,
        store: PlaceBackend,
        loader: &'static ResourceLoader,
    ) -> Self {
        let normalizer = Normalizer::from_config(&config.places);
        Self {
            config,
            source: DataSource::new(Arc::new(store), normalizer),
            loader,
        }
    }

    /// The shared mapping script load, started on first use.
    pub fn script(&self) -> LoadFuture {
        let source = ScriptSource::from_config(&self.config.map);
        self.loader.ensure_loaded(move || source.load())
    }

    /// The script loader, for status reporting.
    pub const fn loader(&self) -> &'static ResourceLoader {
        self.loader
    }
}
