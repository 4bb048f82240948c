//! Errors returned by data functions and mapped onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::db::DbError;
use crate::http::response::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: sign in to continue")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests, slow down")]
    RateLimited,

    #[error("Failed to {action}: {source}")]
    Database {
        action: &'static str,
        #[source]
        source: DbError,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Log a persistence failure and wrap it with what was being attempted
pub fn db_failure(action: &'static str) -> impl FnOnce(DbError) -> AppError {
    move |source| {
        error!(error = %source, "Failed to {}", action);
        AppError::Database { action, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), ApiResponse::<()>::error(self.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_message_has_context() {
        let err = db_failure("create store")(DbError::Api {
            status: 500,
            body: "connection reset".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Failed to create store: API error (status 500): connection reset"
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
