//! Database abstraction layer
//!
//! This module provides the schema introspection and statement execution
//! seam used by the API, plus the PostgreSQL implementation.

pub mod postgres;
pub mod traits;

// Re-export the main trait
pub use traits::{DatabaseError, DatabaseProvider, TableRef};
