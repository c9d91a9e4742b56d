//! Startup validation of the grid configuration against the live schema
//!
//! [`ValidatedConfig`] is the only way to obtain [`Identifier`] values, and the
//! query builder only interpolates identifiers. A configuration that names a
//! column the table does not have therefore never reaches the SQL layer.

use crate::config::{ConfigError, GridConfig};
use crate::database::TableRef;
use std::collections::{BTreeMap, BTreeSet};

/// Column every variables table must have
pub const ID_COLUMN: &str = "id";

/// Compare the columns a configuration refers to with the columns the table has
///
/// Every unknown column is reported at once so the operator can fix the
/// configuration in a single pass.
pub fn validate(candidates: &BTreeSet<String>, schema: &BTreeSet<String>) -> Result<(), ConfigError> {
    let unknown: BTreeSet<String> = candidates.difference(schema).cloned().collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::UnknownColumns(unknown))
    }
}

/// A table, schema or column name confirmed against the live schema
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated column mapping for a single grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedGrid {
    pub data: Identifier,
    pub interval: Option<Identifier>,
    pub delimiter: String,
}

/// Grid configuration that passed schema validation
///
/// Built once at startup and shared read-only with every request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    schema: Identifier,
    table: Identifier,
    id_column: Identifier,
    levels: Vec<Identifier>,
    grids: BTreeMap<String, ValidatedGrid>,
    name_separator: String,
}

impl ValidatedConfig {
    /// Validate `config` against the columns introspected for `table`
    ///
    /// # Arguments
    ///
    /// * `config` - Parsed grid configuration
    /// * `table` - The table the columns were read from
    /// * `columns` - Column names present in the live table
    pub fn new(
        config: GridConfig,
        table: &TableRef,
        columns: &BTreeSet<String>,
    ) -> Result<Self, ConfigError> {
        let mut candidates = config.candidate_columns();
        candidates.insert(ID_COLUMN.to_string());
        validate(&candidates, columns)?;

        let levels = config
            .levels()
            .iter()
            .map(|level| Identifier(level.clone()))
            .collect();

        let grids = config
            .grids()
            .iter()
            .map(|(name, grid)| {
                let validated = ValidatedGrid {
                    data: Identifier(grid.data.clone()),
                    interval: grid.interval.clone().map(Identifier),
                    delimiter: grid.delimiter.clone(),
                };
                (name.clone(), validated)
            })
            .collect();

        Ok(Self {
            schema: Identifier(table.schema.clone()),
            table: Identifier(table.name.clone()),
            id_column: Identifier(ID_COLUMN.to_string()),
            levels,
            grids,
            name_separator: config.name_separator().to_string(),
        })
    }

    pub fn schema(&self) -> &Identifier {
        &self.schema
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    pub fn id_column(&self) -> &Identifier {
        &self.id_column
    }

    /// Level columns in declared order
    pub fn levels(&self) -> &[Identifier] {
        &self.levels
    }

    /// Grids keyed by name, in lexicographic order
    pub fn grids(&self) -> &BTreeMap<String, ValidatedGrid> {
        &self.grids
    }

    pub fn grid(&self, name: &str) -> Option<&ValidatedGrid> {
        self.grids.get(name)
    }

    pub fn name_separator(&self) -> &str {
        &self.name_separator
    }
}
