//! Variable listing and lookup endpoints

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
};

use crate::api::error::{ApiError, ID_NOT_FOUND};
use crate::api::AppState;
use crate::database::traits::DatabaseProvider;
use crate::query::{list_variables_statement, variable_by_id_statement};
use crate::resolver::GridResolver;
use crate::schema::VariableQuery;

/// Handler for GET /variables
///
/// Returns every variable with its display name and the grids it has data for:
///
/// ```json
/// [
///   {
///     "id": 1,
///     "name": "poblacion_-_0-14",
///     "available_grids": ["mun", "state"],
///     "level_size": 0,
///     "filter_fields": []
///   }
/// ]
/// ```
pub async fn list_variables_handler<DB: DatabaseProvider, R: GridResolver>(
    State(state): State<AppState<DB, R>>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let statement = list_variables_statement(&state.config);
    let rows = state.database.fetch_rows(&statement).await?;

    tracing::debug!(count = rows.len(), "listed variables");
    Ok(Json(rows))
}

/// Handler for GET /variables/{id}
///
/// Query parameters:
/// - q: select-list override (default: `*`, not applied)
/// - offset: row offset (default: 0)
/// - limit: maximum rows (default: 10)
///
/// Responds 404 `{"error": "ID no encontrado"}` when no row matches.
pub async fn get_variable_handler<DB: DatabaseProvider, R: GridResolver>(
    State(state): State<AppState<DB, R>>,
    Path(id): Path<String>,
    query: Result<Query<VariableQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(query) = query?;
    if query.q != "*" {
        tracing::debug!(q = %query.q, "ignoring select-list override");
    }

    let statement = variable_by_id_statement(
        &state.config,
        &id,
        i64::from(query.limit),
        i64::from(query.offset),
    );

    state
        .database
        .fetch_rows(&statement)
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(ID_NOT_FOUND.to_string()))
}
