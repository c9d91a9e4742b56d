//! Dynamic query builder
//!
//! SQL is assembled from typed fragments. A fragment can only contain static
//! SQL text, validated [`Identifier`]s and string literals taken from the
//! validated configuration (grid names, separators, delimiters). Values that
//! come from a request are never part of a fragment: they are pushed onto a
//! [`Statement`] as bound parameters and appear in the SQL as `$n`.

use crate::validate::{Identifier, ValidatedConfig};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Raw(&'static str),
    Ident(Identifier),
    Text(String),
}

/// A piece of SQL built only from static text, validated identifiers and
/// configuration literals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlFragment {
    parts: Vec<Part>,
}

impl SqlFragment {
    pub fn new() -> Self {
        Self::default()
    }

    fn raw(mut self, sql: &'static str) -> Self {
        self.parts.push(Part::Raw(sql));
        self
    }

    fn ident(mut self, identifier: &Identifier) -> Self {
        self.parts.push(Part::Ident(identifier.clone()));
        self
    }

    fn text(mut self, value: &str) -> Self {
        self.parts.push(Part::Text(value.to_string()));
        self
    }

    fn append(mut self, other: SqlFragment) -> Self {
        self.parts.extend(other.parts);
        self
    }

    /// Render the fragment as PostgreSQL text
    pub fn render(&self) -> String {
        let mut sql = String::new();
        for part in &self.parts {
            match part {
                Part::Raw(text) => sql.push_str(text),
                Part::Ident(identifier) => sql.push_str(&quote_identifier(identifier.as_str())),
                Part::Text(value) => sql.push_str(&quote_literal(value)),
            }
        }
        sql
    }
}

/// Quote an identifier so it can never terminate early
fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Quote a string literal (standard_conforming_strings)
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A value bound to a statement placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    BigInt(i64),
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        BindValue::Text(value.to_string())
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        BindValue::Text(value)
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        BindValue::BigInt(value)
    }
}

/// SQL text with `$n` placeholders and the values bound to them, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<BindValue>,
}

impl Statement {
    fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, fragment: &SqlFragment) -> &mut Self {
        self.sql.push_str(&fragment.render());
        self
    }

    fn push_raw(&mut self, sql: &'static str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    fn push_bind(&mut self, value: impl Into<BindValue>) -> &mut Self {
        self.params.push(value.into());
        // Writing to a String cannot fail
        let _ = write!(self.sql, "${}", self.params.len());
        self
    }

    fn push_from(&mut self, config: &ValidatedConfig) -> &mut Self {
        let table = SqlFragment::new()
            .ident(config.schema())
            .raw(".")
            .ident(config.table());
        self.push_raw(" FROM ").push(&table)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[BindValue] {
        &self.params
    }
}

/// Array of the level columns, in declared order
///
/// `ARRAY["name"::text, "bin"::text]`
pub fn name_expr(config: &ValidatedConfig) -> SqlFragment {
    let mut fragment = SqlFragment::new().raw("ARRAY[");
    for (index, level) in config.levels().iter().enumerate() {
        if index > 0 {
            fragment = fragment.raw(", ");
        }
        fragment = fragment.ident(level).raw("::text");
    }
    fragment.raw("]")
}

/// Display name: the level values joined by the configured separator
pub fn display_name_expr(config: &ValidatedConfig) -> SqlFragment {
    SqlFragment::new()
        .raw("array_to_string(")
        .append(name_expr(config))
        .raw(", ")
        .text(config.name_separator())
        .raw(")")
}

/// Array of grid names whose data column is present and non-empty
///
/// One `CASE` per grid, in grid-name order, with the `NULL`s removed. A grid
/// with an interval column additionally requires the interval to be present.
pub fn available_grids_expr(config: &ValidatedConfig) -> SqlFragment {
    let mut fragment = SqlFragment::new().raw("array_remove(ARRAY[");

    for (index, (name, grid)) in config.grids().iter().enumerate() {
        if index > 0 {
            fragment = fragment.raw(", ");
        }

        fragment = fragment
            .raw("CASE WHEN ")
            .ident(&grid.data)
            .raw(" IS NOT NULL AND ")
            .ident(&grid.data)
            .raw("::text NOT IN ('', '{}')");

        if let Some(interval) = &grid.interval {
            fragment = fragment.raw(" AND ").ident(interval).raw(" IS NOT NULL");
        }

        fragment = fragment.raw(" THEN ").text(name).raw(" END");
    }

    fragment.raw("]::text[], NULL)")
}

/// Cell expressions for one grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellsExpr {
    /// The data column split on the grid's delimiter
    pub cells: SqlFragment,

    /// Number of elements in `cells`, zero when there is no data
    pub count: SqlFragment,
}

/// Cell expressions for `grid`, or `None` if the grid is not configured
///
/// Both `{01,02}` and `01,02` encodings split the same way. An empty value
/// yields no cells.
pub fn cells_expr(config: &ValidatedConfig, grid: &str) -> Option<CellsExpr> {
    let grid = config.grid(grid)?;

    let cells = SqlFragment::new()
        .raw("string_to_array(NULLIF(btrim(")
        .ident(&grid.data)
        .raw("::text, '{}'), ''), ")
        .text(&grid.delimiter)
        .raw(")");

    let count = SqlFragment::new()
        .raw("COALESCE(cardinality(")
        .append(cells.clone())
        .raw("), 0)");

    Some(CellsExpr { cells, count })
}

/// `GET /variables`: every variable with its display name and available grids
pub fn list_variables_statement(config: &ValidatedConfig) -> Statement {
    let mut statement = Statement::new();
    let id = SqlFragment::new().ident(config.id_column());

    statement
        .push_raw("SELECT ")
        .push(&id)
        .push_raw(" AS id, ")
        .push(&display_name_expr(config))
        .push_raw(" AS name, ")
        .push(&available_grids_expr(config))
        .push_raw(" AS available_grids, 0 AS level_size, ARRAY[]::text[] AS filter_fields")
        .push_from(config)
        .push_raw(" ORDER BY ")
        .push(&id);

    statement
}

/// `GET /variables/{id}`: the variable with the given id
///
/// The id column is compared as text so any request string is a valid
/// parameter; a non-matching string simply yields no rows.
pub fn variable_by_id_statement(config: &ValidatedConfig, id: &str, limit: i64, offset: i64) -> Statement {
    let mut statement = Statement::new();
    let id_column = SqlFragment::new().ident(config.id_column());

    statement
        .push_raw("SELECT ")
        .push(&id_column)
        .push_raw(" AS id, 0 AS level_id")
        .push_from(config)
        .push_raw(" WHERE ")
        .push(&id_column)
        .push_raw("::text = ")
        .push_bind(id)
        .push_raw(" LIMIT ")
        .push_bind(limit)
        .push_raw(" OFFSET ")
        .push_bind(offset);

    statement
}

/// `GET /get-data/{id}`: cells of one variable for one grid
///
/// Returns `None` if `grid` is not a configured grid.
pub fn grid_data_statement(config: &ValidatedConfig, grid: &str, id: &str, grid_id: &str) -> Option<Statement> {
    let cells = cells_expr(config, grid)?;
    let mut statement = Statement::new();
    let id_column = SqlFragment::new().ident(config.id_column());

    statement
        .push_raw("SELECT ")
        .push(&id_column)
        .push_raw(" AS id, ")
        .push_bind(grid_id)
        .push_raw("::text AS grid_id, 0 AS level_id, ")
        .push(&cells.cells)
        .push_raw(" AS cells, ")
        .push(&cells.count)
        .push_raw(" AS n")
        .push_from(config)
        .push_raw(" WHERE ")
        .push(&id_column)
        .push_raw("::text = ")
        .push_bind(id);

    Some(statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::database::TableRef;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn validated(raw: serde_json::Value) -> ValidatedConfig {
        let config = GridConfig::parse(&raw).unwrap();
        let mut columns: BTreeSet<String> = config.candidate_columns();
        columns.insert("id".to_string());
        ValidatedConfig::new(config, &TableRef::new("public", "variables"), &columns).unwrap()
    }

    fn census_config() -> ValidatedConfig {
        validated(json!({
            "levels": ["name", "bin"],
            "grids": {
                "state": { "data": "cells_state", "interval": "interval_state" },
                "mun": { "data": "cells_mun" },
                "ageb": { "data": "cells_ageb", "delimiter": ";" }
            }
        }))
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("cells_mun"), "\"cells_mun\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("mun"), "'mun'");
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
    }

    #[test]
    fn test_name_expr_keeps_level_order() {
        let config = census_config();
        assert_eq!(
            name_expr(&config).render(),
            "ARRAY[\"name\"::text, \"bin\"::text]"
        );
        assert_eq!(
            display_name_expr(&config).render(),
            "array_to_string(ARRAY[\"name\"::text, \"bin\"::text], '_-_')"
        );
    }

    #[test]
    fn test_available_grids_expr_is_sorted_by_grid_name() {
        let rendered = available_grids_expr(&census_config()).render();

        assert_eq!(
            rendered,
            "array_remove(ARRAY[\
             CASE WHEN \"cells_ageb\" IS NOT NULL AND \"cells_ageb\"::text NOT IN ('', '{}') THEN 'ageb' END, \
             CASE WHEN \"cells_mun\" IS NOT NULL AND \"cells_mun\"::text NOT IN ('', '{}') THEN 'mun' END, \
             CASE WHEN \"cells_state\" IS NOT NULL AND \"cells_state\"::text NOT IN ('', '{}') \
             AND \"interval_state\" IS NOT NULL THEN 'state' END\
             ]::text[], NULL)"
        );
    }

    #[test]
    fn test_cells_expr_uses_grid_delimiter() {
        let config = census_config();

        let municipality = cells_expr(&config, "mun").unwrap();
        assert_eq!(
            municipality.cells.render(),
            "string_to_array(NULLIF(btrim(\"cells_mun\"::text, '{}'), ''), ',')"
        );
        assert_eq!(
            municipality.count.render(),
            "COALESCE(cardinality(string_to_array(NULLIF(btrim(\"cells_mun\"::text, '{}'), ''), ',')), 0)"
        );

        // Cells and count split on the same delimiter
        let ageb = cells_expr(&config, "ageb").unwrap();
        assert!(ageb.cells.render().ends_with("''), ';')"));
        assert!(ageb.count.render().contains(&ageb.cells.render()));

        assert!(cells_expr(&config, "country").is_none());
    }

    #[test]
    fn test_list_variables_statement() {
        let statement = list_variables_statement(&census_config());

        assert!(statement.params().is_empty());
        assert!(statement.sql().starts_with("SELECT \"id\" AS id, array_to_string("));
        assert!(statement.sql().contains(" AS available_grids, 0 AS level_size, ARRAY[]::text[] AS filter_fields"));
        assert!(statement.sql().ends_with(" FROM \"public\".\"variables\" ORDER BY \"id\""));
    }

    #[test]
    fn test_variable_by_id_statement_binds_request_values() {
        let statement = variable_by_id_statement(&census_config(), "42", 10, 0);

        assert_eq!(
            statement.sql(),
            "SELECT \"id\" AS id, 0 AS level_id FROM \"public\".\"variables\" \
             WHERE \"id\"::text = $1 LIMIT $2 OFFSET $3"
        );
        assert_eq!(
            statement.params(),
            [
                BindValue::Text("42".to_string()),
                BindValue::BigInt(10),
                BindValue::BigInt(0)
            ]
        );
    }

    #[test]
    fn test_grid_data_statement() {
        let config = census_config();
        let statement = grid_data_statement(&config, "mun", "7", "2").unwrap();

        assert_eq!(
            statement.sql(),
            "SELECT \"id\" AS id, $1::text AS grid_id, 0 AS level_id, string_to_array(NULLIF(btrim(\"cells_mun\"::text, '{}'), ''), ',') AS cells, \
             COALESCE(cardinality(string_to_array(NULLIF(btrim(\"cells_mun\"::text, '{}'), ''), ',')), 0) AS n \
             FROM \"public\".\"variables\" WHERE \"id\"::text = $2"
        );
        assert_eq!(
            statement.params(),
            [BindValue::Text("2".to_string()), BindValue::Text("7".to_string())]
        );

        assert!(grid_data_statement(&config, "country", "7", "2").is_none());
    }

    #[test]
    fn test_adversarial_id_never_reaches_sql_text() {
        let config = census_config();
        let hostile = "1; DROP TABLE variables; --' OR '1'='1";

        let by_id = variable_by_id_statement(&config, hostile, 10, 0);
        assert!(!by_id.sql().contains("DROP"));
        assert!(!by_id.sql().contains("'1'='1"));
        assert_eq!(by_id.params()[0], BindValue::Text(hostile.to_string()));

        let data = grid_data_statement(&config, "mun", hostile, hostile).unwrap();
        assert!(!data.sql().contains("DROP"));
        assert_eq!(data.params().len(), 2);
    }

    #[test]
    fn test_config_literals_are_escaped() {
        let config = validated(json!({
            "levels": ["name"],
            "grids": { "o'grid": { "data": "cells\"odd" } },
            "name_separator": "' || pg_sleep(1) || '"
        }));

        assert!(available_grids_expr(&config).render().contains("THEN 'o''grid' END"));
        assert!(available_grids_expr(&config).render().contains("\"cells\"\"odd\""));
        assert!(display_name_expr(&config)
            .render()
            .ends_with(", ''' || pg_sleep(1) || ''')"));
    }
}
