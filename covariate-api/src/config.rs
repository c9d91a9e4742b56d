//! Grid configuration model
//!
//! The grid configuration is an operator-supplied JSON document describing
//! which columns of the variables table hold the descriptive "levels" and
//! which columns hold per-grid cell data:
//!
//! ```json
//! {
//!   "levels": ["name", "bin"],
//!   "grids": {
//!     "state": { "data": "cells_state", "interval": "interval_state" },
//!     "mun":   { "data": "cells_mun" },
//!     "ageb":  { "data": "cells_ageb", "delimiter": "," }
//!   }
//! }
//! ```
//!
//! Parsing only checks the shape of the document. Whether the referenced
//! columns exist is decided by [`crate::validate`] against the live schema.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Separator used to join level values when none is configured
pub const DEFAULT_NAME_SEPARATOR: &str = "_-_";

/// Cell delimiter used when a grid does not configure one
pub const DEFAULT_CELL_DELIMITER: &str = ",";

/// Errors raised while loading, parsing or validating the grid configuration
///
/// All of these are fatal at startup: the service never serves traffic with
/// a configuration that failed any of these checks.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read grid config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("grid config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("grid config must be a JSON object")]
    InvalidRoot,

    #[error("grid config is missing the 'levels' key")]
    MissingLevels,

    #[error("'levels' must be a non-empty list of non-empty strings")]
    InvalidLevelsType,

    #[error("grid config is missing the 'grids' key")]
    MissingGrids,

    #[error("'grids' must be a non-empty mapping of grid name to grid definition")]
    InvalidGridsType,

    #[error("grid '{0}' must be a mapping")]
    InvalidGridEntry(String),

    #[error("grid '{0}' is missing the 'data' key")]
    MissingGridData(String),

    #[error("grid '{0}': 'data' must be a non-empty string")]
    InvalidGridDataType(String),

    #[error("grid '{0}': 'interval' must be a non-empty string")]
    InvalidGridIntervalType(String),

    #[error("grid '{0}': 'delimiter' must be a non-empty string")]
    InvalidGridDelimiterType(String),

    #[error("'name_separator' must be a string")]
    InvalidNameSeparator,

    #[error("grid config references columns missing from the table: {}", join_columns(.0))]
    UnknownColumns(BTreeSet<String>),
}

fn join_columns(columns: &BTreeSet<String>) -> String {
    columns.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Column mapping for a single grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridDefinition {
    /// Column holding the grid's cell-membership data
    pub data: String,

    /// Column holding the grid's interval data, if the grid has one
    pub interval: Option<String>,

    /// Delimiter between cell ids inside the data column
    pub delimiter: String,
}

/// Parsed (but not yet schema-validated) grid configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridConfig {
    levels: Vec<String>,
    grids: BTreeMap<String, GridDefinition>,
    name_separator: String,
}

impl GridConfig {
    /// Read and parse a grid configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&text)
    }

    /// Parse a grid configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: Value = serde_json::from_str(text)?;
        Self::parse(&raw)
    }

    /// Parse a grid configuration from an already decoded JSON document
    pub fn parse(raw: &Value) -> Result<Self, ConfigError> {
        let root = raw.as_object().ok_or(ConfigError::InvalidRoot)?;

        let levels = parse_levels(root.get("levels"))?;
        let grids = parse_grids(root.get("grids"))?;

        let name_separator = match root.get("name_separator") {
            None => DEFAULT_NAME_SEPARATOR.to_string(),
            Some(Value::String(separator)) => separator.clone(),
            Some(_) => return Err(ConfigError::InvalidNameSeparator),
        };

        Ok(Self {
            levels,
            grids,
            name_separator,
        })
    }

    /// Level columns in declared order
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Grid definitions keyed by grid name, in lexicographic order
    pub fn grids(&self) -> &BTreeMap<String, GridDefinition> {
        &self.grids
    }

    pub fn name_separator(&self) -> &str {
        &self.name_separator
    }

    /// Every column name the configuration refers to
    pub fn candidate_columns(&self) -> BTreeSet<String> {
        let mut columns: BTreeSet<String> = self.levels.iter().cloned().collect();

        for grid in self.grids.values() {
            columns.insert(grid.data.clone());
            if let Some(interval) = &grid.interval {
                columns.insert(interval.clone());
            }
        }

        columns
    }
}

fn parse_levels(value: Option<&Value>) -> Result<Vec<String>, ConfigError> {
    let items = value
        .ok_or(ConfigError::MissingLevels)?
        .as_array()
        .ok_or(ConfigError::InvalidLevelsType)?;

    if items.is_empty() {
        return Err(ConfigError::InvalidLevelsType);
    }

    items
        .iter()
        .map(|item| match item {
            Value::String(level) if !level.is_empty() => Ok(level.clone()),
            _ => Err(ConfigError::InvalidLevelsType),
        })
        .collect()
}

fn parse_grids(value: Option<&Value>) -> Result<BTreeMap<String, GridDefinition>, ConfigError> {
    let entries = value
        .ok_or(ConfigError::MissingGrids)?
        .as_object()
        .filter(|entries| !entries.is_empty())
        .ok_or(ConfigError::InvalidGridsType)?;

    entries
        .iter()
        .map(|(name, entry)| {
            let entry = entry
                .as_object()
                .ok_or_else(|| ConfigError::InvalidGridEntry(name.clone()))?;
            Ok((name.clone(), parse_grid(name, entry)?))
        })
        .collect()
}

fn parse_grid(name: &str, entry: &Map<String, Value>) -> Result<GridDefinition, ConfigError> {
    let data = match entry.get("data") {
        None => return Err(ConfigError::MissingGridData(name.to_string())),
        Some(Value::String(data)) if !data.is_empty() => data.clone(),
        Some(_) => return Err(ConfigError::InvalidGridDataType(name.to_string())),
    };

    let interval = match entry.get("interval") {
        None | Some(Value::Null) => None,
        Some(Value::String(interval)) if !interval.is_empty() => Some(interval.clone()),
        Some(_) => return Err(ConfigError::InvalidGridIntervalType(name.to_string())),
    };

    let delimiter = match entry.get("delimiter") {
        None => DEFAULT_CELL_DELIMITER.to_string(),
        Some(Value::String(delimiter)) if !delimiter.is_empty() => delimiter.clone(),
        Some(_) => return Err(ConfigError::InvalidGridDelimiterType(name.to_string())),
    };

    Ok(GridDefinition {
        data,
        interval,
        delimiter,
    })
}
