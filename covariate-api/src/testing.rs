//! Test doubles for the database and region catalog seams

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::config::GridConfig;
use crate::database::{DatabaseError, DatabaseProvider, TableRef};
use crate::query::Statement;
use crate::resolver::{GridResolver, ResolveError};
use crate::validate::ValidatedConfig;

type Responder = Box<dyn Fn(&Statement) -> Result<Vec<Value>, DatabaseError> + Send + Sync>;

/// In-memory database that records every statement it is asked to run
pub struct RecordingDatabase {
    columns: BTreeSet<String>,
    responder: Responder,
    statements: Arc<Mutex<Vec<Statement>>>,
}

impl RecordingDatabase {
    pub fn new(
        responder: impl Fn(&Statement) -> Result<Vec<Value>, DatabaseError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            columns: census_columns(),
            responder: Box::new(responder),
            statements: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_columns(mut self, columns: BTreeSet<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Handle for inspecting executed statements after the database is moved
    pub fn statements(&self) -> Arc<Mutex<Vec<Statement>>> {
        self.statements.clone()
    }
}

#[async_trait]
impl DatabaseProvider for RecordingDatabase {
    async fn list_columns(&self, table: &TableRef) -> Result<BTreeSet<String>, DatabaseError> {
        if self.columns.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }
        Ok(self.columns.clone())
    }

    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<Value>, DatabaseError> {
        self.statements.lock().unwrap().push(statement.clone());
        (self.responder)(statement)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        (self.responder)(&Statement::default()).map(|_| ())
    }
}

/// Resolver answering from a fixed id → name table
pub struct StaticResolver {
    grids: HashMap<String, String>,
    available: bool,
}

impl StaticResolver {
    pub fn new(grids: &[(&str, &str)]) -> Self {
        Self {
            grids: grids
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            grids: HashMap::new(),
            available: false,
        }
    }
}

#[async_trait]
impl GridResolver for StaticResolver {
    async fn resolve_grid_name(&self, grid_id: &str) -> Result<String, ResolveError> {
        if !self.available {
            return Err(ResolveError::UpstreamUnavailable("connection refused".to_string()));
        }
        self.grids
            .get(grid_id)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(grid_id.to_string()))
    }
}

pub fn census_columns() -> BTreeSet<String> {
    [
        "id",
        "name",
        "bin",
        "cells_state",
        "interval_state",
        "cells_mun",
        "interval_mun",
        "cells_ageb",
        "interval_ageb",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn census_grid_config() -> GridConfig {
    GridConfig::parse(&json!({
        "levels": ["name", "bin"],
        "grids": {
            "state": { "data": "cells_state", "interval": "interval_state" },
            "mun": { "data": "cells_mun", "interval": "interval_mun" },
            "ageb": { "data": "cells_ageb", "interval": "interval_ageb" }
        }
    }))
    .unwrap()
}

pub fn census_config() -> ValidatedConfig {
    ValidatedConfig::new(
        census_grid_config(),
        &TableRef::new("public", "variables"),
        &census_columns(),
    )
    .unwrap()
}
