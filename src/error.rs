use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Connection failed: {cause}")]
    ConnectionFailed { cause: String },

    #[error("Query failed: {cause}")]
    QueryFailed { cause: String },

    #[error("Health check timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Failed to create pool: {cause}")]
    PoolSetup { cause: String },

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Fixed-shape body for every non-health JSON response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        // Internal text stays in the logs
        let message = match &self {
            ServiceError::ConnectionFailed { .. }
            | ServiceError::QueryFailed { .. }
            | ServiceError::Timeout { .. } => "Database unavailable",
            ServiceError::PoolSetup { .. } => "Connection pool unavailable",
            ServiceError::Metrics(_) => "Failed to encode metrics",
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(MessageResponse::new(message)),
        )
            .into_response()
    }
}

impl From<tokio_postgres::Error> for ServiceError {
    fn from(err: tokio_postgres::Error) -> Self {
        ServiceError::QueryFailed {
            cause: err.to_string(),
        }
    }
}

impl From<deadpool_postgres::PoolError> for ServiceError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        ServiceError::ConnectionFailed {
            cause: format!("Pool error: {}", err),
        }
    }
}

impl From<deadpool_postgres::CreatePoolError> for ServiceError {
    fn from(err: deadpool_postgres::CreatePoolError) -> Self {
        ServiceError::PoolSetup {
            cause: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
