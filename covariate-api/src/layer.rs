//! CovariateApi - router construction and startup validation
//!
//! This module provides the main entry point for serving the covariate API:
//! validate the grid configuration against the live table, then turn the
//! validated configuration, database and resolver into an Axum router.

use crate::api::{
    get_data_handler, get_variable_handler, health_handler, hello_handler, list_variables_handler,
    AppState,
};
use crate::config::GridConfig;
use crate::database::traits::{DatabaseProvider, TableRef};
use crate::resolver::GridResolver;
use crate::validate::ValidatedConfig;
use crate::{Error, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// The covariate API, ready to be turned into a router
///
/// # Example
///
/// ```rust,no_run
/// use covariate_api::{CovariateApi, GridConfig, PostgresProvider, RegionCatalogResolver, TableRef};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = sqlx::PgPool::connect("postgres://localhost/census").await?;
/// let grid_config = GridConfig::load("grids.json")?;
/// let resolver = RegionCatalogResolver::new(
///     "http://regions.local/grids",
///     Duration::from_secs(5),
///     Duration::ZERO,
/// )?;
///
/// let api = CovariateApi::bootstrap(
///     grid_config,
///     &TableRef::new("public", "variables"),
///     PostgresProvider::new(pool),
///     resolver,
/// )
/// .await?;
/// let app = api.into_router();
/// # Ok(())
/// # }
/// ```
pub struct CovariateApi<DB: DatabaseProvider, R: GridResolver> {
    config: Arc<ValidatedConfig>,
    database: Arc<DB>,
    resolver: Arc<R>,
}

impl<DB: DatabaseProvider, R: GridResolver> CovariateApi<DB, R> {
    /// Create the API from an already validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Grid configuration validated against the live table
    /// * `database` - The database provider implementation
    /// * `resolver` - Grid id resolver
    pub fn new(config: ValidatedConfig, database: DB, resolver: R) -> Self {
        Self {
            config: Arc::new(config),
            database: Arc::new(database),
            resolver: Arc::new(resolver),
        }
    }

    /// Introspect `table`, validate `grid_config` against it and create the API
    ///
    /// Fails with every unknown column listed at once if the configuration
    /// does not match the table.
    pub async fn bootstrap(grid_config: GridConfig, table: &TableRef, database: DB, resolver: R) -> Result<Self> {
        let columns = database
            .list_columns(table)
            .await
            .map_err(|source| Error::SchemaUnavailable {
                table: table.to_string(),
                source,
            })?;

        let config = ValidatedConfig::new(grid_config, table, &columns)?;

        tracing::info!(
            table = %table,
            levels = config.levels().len(),
            grids = ?config.grids().keys().collect::<Vec<_>>(),
            "grid configuration validated"
        );

        Ok(Self::new(config, database, resolver))
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Convert into an Axum Router
    ///
    /// The returned router serves:
    /// - `GET /`
    /// - `GET /health`
    /// - `GET /variables`
    /// - `GET /variables/{id}`
    /// - `GET /get-data/{id}`
    ///
    /// with request tracing and permissive CORS.
    pub fn into_router(self) -> Router {
        let state = AppState {
            config: self.config,
            database: self.database,
            resolver: self.resolver,
        };

        // Note: Axum 0.8 uses {param} syntax instead of :param
        Router::new()
            .route("/", get(hello_handler))
            .route("/health", get(health_handler::<DB, R>))
            .route("/variables", get(list_variables_handler::<DB, R>))
            .route("/variables/{id}", get(get_variable_handler::<DB, R>))
            .route("/get-data/{id}", get(get_data_handler::<DB, R>))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }
}
