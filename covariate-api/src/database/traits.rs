//! Database provider trait
//!
//! The API never talks to a driver directly. Everything it needs from the
//! database goes through this trait: schema introspection at startup and
//! execution of parameterized statements at request time.

use crate::query::Statement;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Database provider trait for schema introspection and statement execution
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// List the column names of a table
    ///
    /// # Arguments
    ///
    /// * `table` - Schema-qualified table to introspect
    ///
    /// # Returns
    ///
    /// The set of column names, or `TableNotFound` when the table has none
    async fn list_columns(&self, table: &TableRef) -> Result<BTreeSet<String>, DatabaseError>;

    /// Execute a read-only statement with its bound parameters
    ///
    /// # Returns
    ///
    /// Each result row as a JSON object keyed by column name
    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<serde_json::Value>, DatabaseError>;

    /// Check that the database is reachable
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database could not be reached (connect, pool or I/O failure)
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Generic query error
    #[error("Database error: {0}")]
    Query(String),

    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Row could not be converted to JSON
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DatabaseError::Unavailable(error.to_string()),
            other => DatabaseError::Query(other.to_string()),
        }
    }
}
