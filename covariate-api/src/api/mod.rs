//! REST API endpoints
//!
//! This module contains the endpoint handlers and the state they share.

use std::sync::Arc;

use crate::database::traits::DatabaseProvider;
use crate::resolver::GridResolver;
use crate::validate::ValidatedConfig;

pub mod data;
pub mod error;
pub mod root;
pub mod variables;

// Re-export handlers for convenience
pub use data::get_data_handler;
pub use error::ApiError;
pub use root::{health_handler, hello_handler};
pub use variables::{get_variable_handler, list_variables_handler};

/// State shared by every handler
///
/// All three members are read-only for the lifetime of the process.
pub struct AppState<DB: DatabaseProvider, R: GridResolver> {
    pub config: Arc<ValidatedConfig>,
    pub database: Arc<DB>,
    pub resolver: Arc<R>,
}

impl<DB: DatabaseProvider, R: GridResolver> Clone for AppState<DB, R> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            database: self.database.clone(),
            resolver: self.resolver.clone(),
        }
    }
}
