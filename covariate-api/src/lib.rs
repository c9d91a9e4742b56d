//! # covariate-api
//!
//! HTTP API over a census covariates table whose per-grid columns are
//! described by an external grid configuration.
//!
//! ## Features
//!
//! - Grid configuration (levels and grids) loaded from JSON
//! - Startup validation of every configured column against the live table
//! - SQL built from validated identifiers only; request values are always bound
//! - Grid ids resolved through an external region catalog, with an optional TTL cache
//! - PostgreSQL provider
//!
//! ## Endpoints
//!
//! - `GET /` - greeting
//! - `GET /health` - database reachability
//! - `GET /variables` - every variable with its display name and available grids
//! - `GET /variables/{id}` - a single variable
//! - `GET /get-data/{id}?grid_id=` - cells of a variable for one grid
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use covariate_api::{CovariateApi, GridConfig, PostgresProvider, RegionCatalogResolver, TableRef};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::PgPool::connect("postgres://localhost/census").await?;
//!     let resolver = RegionCatalogResolver::new(
//!         "http://regions.local/grids",
//!         Duration::from_secs(5),
//!         Duration::ZERO,
//!     )?;
//!
//!     let app = CovariateApi::bootstrap(
//!         GridConfig::load("grids.json")?,
//!         &TableRef::new("public", "variables"),
//!         PostgresProvider::new(pool),
//!         resolver,
//!     )
//!     .await?
//!     .into_router();
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:2112").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

// Public modules
pub mod api;
pub mod config;
pub mod database;
pub mod layer;
pub mod query;
pub mod resolver;
pub mod schema;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

// Public exports
pub use config::{ConfigError, GridConfig, GridDefinition};
pub use layer::CovariateApi;
pub use resolver::{GridResolver, RegionCatalogResolver, ResolveError};
pub use validate::{Identifier, ValidatedConfig, ValidatedGrid};

// Re-export database providers
pub use database::postgres::PostgresProvider;
pub use database::traits::{DatabaseError, DatabaseProvider, TableRef};

// Error type
use thiserror::Error;

/// Startup errors; the service must not serve traffic after any of these
#[derive(Debug, Error)]
pub enum Error {
    #[error("schema unavailable for table {table}: {source}")]
    SchemaUnavailable {
        table: String,
        #[source]
        source: DatabaseError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
