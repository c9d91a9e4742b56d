//! Per-request errors and their HTTP mapping
//!
//! Every error is rendered as `{"error": "<message>"}`.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::database::DatabaseError;
use crate::resolver::ResolveError;
use crate::schema::ErrorResponse;

/// Message for a variable id that matches no row
pub const ID_NOT_FOUND: &str = "ID no encontrado";

/// Message for a `/get-data` request without `grid_id`
pub const GRID_ID_REQUIRED: &str = "grid_id es requerido";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Database(#[from] DatabaseError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(DatabaseError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::NotFound(_) => ApiError::NotFound(error.to_string()),
            ResolveError::UpstreamUnavailable(_) => ApiError::Upstream(error.to_string()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest(GRID_ID_REQUIRED.into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound(ID_NOT_FOUND.into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(ResolveError::UpstreamUnavailable("down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ResolveError::NotFound("99".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DatabaseError::Unavailable("gone".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(DatabaseError::Query("syntax".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
