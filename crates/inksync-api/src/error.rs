use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Version conflict (server version: {server_version})")]
    Conflict { server_version: i64 },
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_version: Option<i64>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<inksync_core::Error> for AppError {
    fn from(error: inksync_core::Error) -> Self {
        match error {
            inksync_core::Error::VersionConflict { server_version } => Self::Conflict {
                server_version: server_version.unwrap_or_default(),
            },
            inksync_core::Error::NotFound(message) => Self::NotFound(message),
            inksync_core::Error::InvalidInput(message) => Self::BadRequest(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, server_version) = match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, None),
            Self::Conflict { server_version } => (StatusCode::CONFLICT, Some(server_version)),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
            server_version,
        };
        (status, Json(body)).into_response()
    }
}
