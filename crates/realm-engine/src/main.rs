//! Province engine binary.
//!
//! Wires the economy, the turn clock, the province store, and the HTTP
//! API together and runs them until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `realm-config.yaml` (or `REALM_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Pick the store: `PostgreSQL` when `database_url` is set, otherwise
//!    the in-memory store
//! 4. For `PostgreSQL`: migrate, sync the catalog tables, and start the
//!    change listener
//! 5. Assemble the engine services and start the turn scheduler
//! 6. Serve the API until shutdown, then drain the scheduler

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use realm_api::{AppState, ServerConfig, start_server};
use realm_core::{
    EngineConfig, LogFormat, LoggingConfig, MemoryProvinceStore, ProvinceStore, run_scheduler,
};
use realm_db::{CatalogStore, PgProvinceStore, PostgresConfig, PostgresPool};
use realm_economy::Economy;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "REALM_CONFIG";

/// Configuration file used when `REALM_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "realm-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let (config, source) = load_config().context("failed to load configuration")?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("realm-engine starting");
    let origin = source
        .as_ref()
        .map_or_else(|| String::from("built-in defaults"), |path| path.display().to_string());
    info!(source = %origin, "Configuration loaded");
    info!(
        world_name = config.world.name,
        turn_interval_secs = config.clock.turn_interval_secs,
        max_turns = config.clock.max_turns,
        scheduler_interval_ms = config.clock.scheduler_interval_ms,
        "World settings"
    );

    // 3. Pick the store and run.
    if config.infrastructure.database_url.is_some() {
        run_postgres(&config)
            .await
            .context("engine failed on PostgreSQL")?;
    } else {
        warn!("No database_url configured, provinces live in memory only");
        let store = Arc::new(MemoryProvinceStore::new());
        run(store, config.economy.clone(), &config)
            .await
            .context("engine failed on the in-memory store")?;
    }

    info!("realm-engine stopped");
    Ok(())
}

/// Read the configuration file, falling back to defaults when it is
/// missing.
///
/// Returns the config and the path it came from, if any.
fn load_config() -> Result<(EngineConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = EngineConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }
    let mut config = EngineConfig::default();
    config.infrastructure.apply_env_overrides();
    config.validate()?;
    Ok((config, None))
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Connect, migrate, and sync the catalog, then run over `PostgreSQL`.
async fn run_postgres(config: &EngineConfig) -> Result<(), EngineError> {
    // 4. Database setup.
    let pg_config = PostgresConfig::from_infrastructure(&config.infrastructure)?;
    let pool = PostgresPool::connect(&pg_config).await?;
    pool.run_migrations().await?;

    let mut economy = config.economy.clone();
    let catalogs = CatalogStore::new(pool.pool());
    if let Some(catalog) = catalogs.load().await? {
        info!(
            buildings = catalog.buildings.len(),
            units = catalog.units.len(),
            spells = catalog.spells.len(),
            "Catalog loaded from database"
        );
        economy.catalog = catalog;
    } else {
        catalogs.seed(&economy.catalog).await?;
        info!("Catalog tables empty, seeded from configuration");
    }

    let store = Arc::new(PgProvinceStore::new(pool.pool().clone()));
    let listener = store.spawn_listener().await?;
    info!(origin = %store.origin(), "Province change listener started");

    let result = run(store, economy, config).await;

    listener.abort();
    pool.close().await;
    result
}

/// Start the scheduler and the API over `store` and block until shutdown.
async fn run<S: ProvinceStore>(
    store: Arc<S>,
    economy: Economy,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    // 5. Engine services and scheduler.
    let state = Arc::new(AppState::new(store, Arc::new(economy), config)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = tokio::spawn(run_scheduler(
        Arc::clone(&state.clock),
        Duration::from_millis(config.clock.scheduler_interval_ms),
        shutdown_rx.clone(),
    ));
    info!(
        every_ms = config.clock.scheduler_interval_ms,
        "Turn scheduler started"
    );

    // 6. Serve until Ctrl-C or until the server stops on its own.
    let server_config = ServerConfig::from(&config.infrastructure);
    let mut server =
        tokio::spawn(async move { start_server(&server_config, state, shutdown_rx).await });

    let served = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
            (&mut server).await
        }
        result = &mut server => {
            warn!("API server stopped unexpectedly");
            let _ = shutdown_tx.send(true);
            result
        }
    };

    let summary = scheduler.await?;
    info!(
        passes = summary.passes,
        committed = summary.committed,
        failed_passes = summary.failed_passes,
        "Turn scheduler stopped"
    );

    served??;
    Ok(())
}
