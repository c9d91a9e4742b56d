//! PostgreSQL database provider implementation

use crate::database::traits::{DatabaseError, DatabaseProvider, TableRef};
use crate::query::{BindValue, Statement};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Column, PgPool, Row, TypeInfo};
use std::collections::BTreeSet;

/// PostgreSQL database provider
pub struct PostgresProvider {
    pool: PgPool,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert a PostgreSQL row to a JSON object
    fn row_to_json(row: &PgRow) -> Result<serde_json::Value, DatabaseError> {
        let mut map = serde_json::Map::new();

        for column in row.columns() {
            let column_name = column.name();
            let type_name = column.type_info().name();

            let value: serde_json::Value = match type_name {
                "BOOL" => {
                    let val: Option<bool> = row.try_get(column_name)?;
                    val.map(serde_json::Value::Bool).unwrap_or(serde_json::Value::Null)
                }
                "INT2" => {
                    let val: Option<i16> = row.try_get(column_name)?;
                    val.map(|v| serde_json::Value::Number(v.into())).unwrap_or(serde_json::Value::Null)
                }
                "INT4" => {
                    let val: Option<i32> = row.try_get(column_name)?;
                    val.map(|v| serde_json::Value::Number(v.into())).unwrap_or(serde_json::Value::Null)
                }
                "INT8" => {
                    let val: Option<i64> = row.try_get(column_name)?;
                    val.map(|v| serde_json::Value::Number(v.into())).unwrap_or(serde_json::Value::Null)
                }
                "FLOAT4" => {
                    let val: Option<f32> = row.try_get(column_name)?;
                    val.and_then(|v| serde_json::Number::from_f64(v as f64))
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
                "FLOAT8" => {
                    let val: Option<f64> = row.try_get(column_name)?;
                    val.and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
                "TEXT" | "VARCHAR" | "CHAR" | "NAME" | "BPCHAR" => {
                    let val: Option<String> = row.try_get(column_name)?;
                    val.map(serde_json::Value::String).unwrap_or(serde_json::Value::Null)
                }
                // Cells and available grids arrive as text arrays
                "TEXT[]" => {
                    let val: Option<Vec<Option<String>>> = row.try_get(column_name)?;
                    val.map(|items| {
                        serde_json::Value::Array(
                            items
                                .into_iter()
                                .map(|item| item.map(serde_json::Value::String).unwrap_or(serde_json::Value::Null))
                                .collect(),
                        )
                    })
                    .unwrap_or(serde_json::Value::Null)
                }
                _ => {
                    // Fallback: try to get as string
                    let val: Option<String> = row.try_get(column_name).ok().flatten();
                    val.map(serde_json::Value::String).unwrap_or(serde_json::Value::Null)
                }
            };

            map.insert(column_name.to_string(), value);
        }

        Ok(serde_json::Value::Object(map))
    }
}

#[async_trait]
impl DatabaseProvider for PostgresProvider {
    async fn list_columns(&self, table: &TableRef) -> Result<BTreeSet<String>, DatabaseError> {
        let query = r#"
            SELECT column_name
            FROM information_schema.columns
            WHERE table_schema = $1
              AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        rows.iter()
            .map(|row| row.try_get::<String, _>("column_name"))
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(DatabaseError::from)
    }

    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<serde_json::Value>, DatabaseError> {
        let mut query = sqlx::query(statement.sql());
        for value in statement.params() {
            query = match value {
                BindValue::Text(text) => query.bind(text.as_str()),
                BindValue::BigInt(number) => query.bind(*number),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(Self::row_to_json).collect()
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
