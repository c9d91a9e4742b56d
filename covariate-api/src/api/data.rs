//! Per-grid cell data endpoint

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
};

use crate::api::error::{ApiError, GRID_ID_REQUIRED, ID_NOT_FOUND};
use crate::api::AppState;
use crate::database::traits::DatabaseProvider;
use crate::query::grid_data_statement;
use crate::resolver::GridResolver;
use crate::schema::{split_list, GridDataQuery};

/// Handler for GET /get-data/{id}
///
/// Query parameters:
/// - grid_id: external grid id, resolved through the region catalog (required)
/// - levels_id, filter_names, filter_values: comma-separated lists (accepted, not applied)
///
/// Response:
/// ```json
/// { "id": 7, "grid_id": "2", "level_id": 0, "cells": ["01001", "01002"], "n": 2 }
/// ```
///
/// 400 when `grid_id` is missing, 404 when it does not resolve to a configured
/// grid or the variable does not exist, 502 when the catalog is unavailable.
pub async fn get_data_handler<DB: DatabaseProvider, R: GridResolver>(
    State(state): State<AppState<DB, R>>,
    Path(id): Path<String>,
    query: Result<Query<GridDataQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(query) = query?;
    let grid_id = query
        .grid_id
        .as_deref()
        .map(str::trim)
        .filter(|grid_id| !grid_id.is_empty())
        .ok_or_else(|| ApiError::BadRequest(GRID_ID_REQUIRED.to_string()))?;

    let levels = split_list(query.levels_id.as_deref());
    let filter_names = split_list(query.filter_names.as_deref());
    let filter_values = split_list(query.filter_values.as_deref());
    tracing::debug!(
        id = %id,
        grid_id,
        ?levels,
        ?filter_names,
        ?filter_values,
        "grid data requested"
    );

    let grid = state.resolver.resolve_grid_name(grid_id).await?;

    let statement = grid_data_statement(&state.config, &grid, &id, grid_id)
        .ok_or_else(|| ApiError::NotFound(format!("grid no configurado: {}", grid)))?;

    state
        .database
        .fetch_rows(&statement)
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(ID_NOT_FOUND.to_string()))
}
