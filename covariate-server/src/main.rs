use clap::Parser;
use covariate_api::{CovariateApi, GridConfig, PostgresProvider, RegionCatalogResolver, ResolveError};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use thiserror::Error;
use axum::Router;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod settings;

use settings::Settings;

#[derive(Debug, Error)]
enum ServerError {
    #[error(transparent)]
    Startup(#[from] covariate_api::Error),

    #[error("invalid grid configuration: {0}")]
    GridConfig(#[from] covariate_api::ConfigError),

    #[error("schema unavailable: could not connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to build region catalog client: {0}")]
    Resolver(#[from] ResolveError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::parse();

    let (listener, router) = match start(&settings).await {
        Ok(started) => started,
        Err(error) => {
            eprintln!("STARTUP_ERROR {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!(
        bind_addr = %settings.bind_addr,
        table = %settings.table(),
        grid_cache_ttl_secs = settings.grid_cache_ttl_secs,
        "covariate-server listening"
    );

    if let Err(error) = axum::serve(listener, router).await {
        tracing::error!(error = %error, "server stopped");
        std::process::exit(1);
    }
}

/// Load and validate everything, then bind the listener
async fn start(settings: &Settings) -> Result<(TcpListener, Router), ServerError> {
    // A malformed file fails before any connection is attempted
    let grid_config = GridConfig::load(&settings.grid_config)?;

    let connect_options = settings.connect_options().map_err(ServerError::Connect)?;
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await
        .map_err(ServerError::Connect)?;

    let resolver = RegionCatalogResolver::new(
        settings.region_catalog_url.clone(),
        settings.region_catalog_timeout(),
        settings.grid_cache_ttl(),
    )?;

    let api = CovariateApi::bootstrap(
        grid_config,
        &settings.table(),
        PostgresProvider::new(pool),
        resolver,
    )
    .await?;

    // Only bind once the configuration has been validated
    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            address: settings.bind_addr,
            source,
        })?;

    Ok((listener, api.into_router()))
}
