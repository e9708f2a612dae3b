//! Vibemap server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `vibemap-config.yaml` (or `$VIBEMAP_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the place store: `PostgreSQL` when a URL is configured,
//!    otherwise in-memory from the seed file
//! 4. Start the mapping script load in the background
//! 5. Serve HTTP and `WebSocket` until terminated

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vibemap_core::config::{StoreConfig, VibemapConfig};
use vibemap_core::store::MemoryPlaceStore;
use vibemap_db::{PgPlaceStore, PostgresConfig, PostgresPool};
use vibemap_server::{AppState, PlaceBackend, ServerConfig, start_server};

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "vibemap-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("VIBEMAP_CONFIG")
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = VibemapConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        config = %config_path.display(),
        port = config.server.port,
        default_location = config.places.default_location,
        maps_key = config.map.api_key.is_some(),
        "vibemap-server starting"
    );

    let store = open_store(&config.store).await?;
    info!(store = store.kind(), "Place store ready");

    let state = Arc::new(AppState::new(config, store));

    // Start the script load now so the first view does not wait for it.
    let script = state.script();
    tokio::spawn(async move {
        match script.await {
            Ok(()) => info!("Mapping script loaded"),
            Err(e) => warn!(error = %e, "Mapping script unavailable, views will report errors"),
        }
    });

    let server = ServerConfig::from(&state.config.server);
    start_server(&server, state).await?;
    Ok(())
}

/// Open the configured place store.
///
/// With a database URL the schema is migrated and, if a seed file is
/// configured, its documents are upserted. Without one the seed file (if
/// any) is loaded into memory.
async fn open_store(store: &StoreConfig) -> anyhow::Result<PlaceBackend> {
    let seed = store.seed_path.as_deref().map(Path::new);

    let Some(pg_config) = PostgresConfig::from_store_config(store) else {
        let memory = match seed {
            Some(path) => MemoryPlaceStore::from_json_file(path)
                .with_context(|| format!("reading seed file {}", path.display()))?,
            None => {
                warn!("No database or seed file configured, serving an empty store");
                MemoryPlaceStore::new()
            }
        };
        return Ok(PlaceBackend::Memory(memory));
    };

    let pool = PostgresPool::connect(&pg_config)
        .await
        .context("connecting to PostgreSQL")?;
    pool.run_migrations().await.context("running migrations")?;
    let places = PgPlaceStore::new(pool);

    if let Some(path) = seed {
        let documents = MemoryPlaceStore::from_json_file(path)
            .with_context(|| format!("reading seed file {}", path.display()))?
            .snapshot()
            .await;
        places
            .upsert_all(&documents)
            .await
            .context("seeding places")?;
    }

    Ok(PlaceBackend::Postgres(places))
}
