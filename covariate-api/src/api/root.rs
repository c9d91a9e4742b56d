//! Greeting and health endpoints

use axum::{extract::State, http::StatusCode, response::Json};

use crate::api::AppState;
use crate::database::traits::DatabaseProvider;
use crate::resolver::GridResolver;
use crate::schema::{ErrorResponse, Greeting, HealthResponse};

/// Handler for GET /
pub async fn hello_handler() -> Json<Greeting> {
    Json(Greeting {
        hola: "mundo".to_string(),
    })
}

/// Handler for GET /health
///
/// Returns 200 when the database answers `SELECT 1`, 503 otherwise.
pub async fn health_handler<DB: DatabaseProvider, R: GridResolver>(
    State(state): State<AppState<DB, R>>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.database.ping().await.map_err(|error| {
        tracing::warn!(error = %error, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: error.to_string(),
            }),
        )
    })?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
