use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;

/// Failures raised while talking to the movie catalog upstream
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// Connection reset, timeout or any other failure before a status was received
    #[error("Upstream transport failure: {0}")]
    Transport(String),

    /// Non-retryable 4xx (anything except 429)
    #[error("Upstream rejected request with status {status}")]
    ClientError { status: u16 },

    /// Non-success status that is neither a client error nor retryable
    #[error("Upstream returned unexpected status {status}")]
    UnexpectedStatus { status: u16 },

    /// Every attempt failed with a retryable cause
    #[error("Upstream retries exhausted after {attempts} attempts (last status: {last_status:?}): {last_error}")]
    Exhausted {
        attempts: u32,
        last_status: Option<u16>,
        last_error: String,
    },

    /// Body could not be read as JSON
    #[error("Malformed upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// True when the final failure was caused by the network rather than an HTTP status
    pub fn is_transport(&self) -> bool {
        match self {
            UpstreamError::Transport(_) => true,
            UpstreamError::Exhausted { last_status, .. } => last_status.is_none(),
            _ => false,
        }
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Recommendation deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("AI service error: {0}")]
    Oracle(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream(UpstreamError::ClientError { .. })
            | AppError::Upstream(UpstreamError::UnexpectedStatus { .. })
            | AppError::Upstream(UpstreamError::Decode(_))
            | AppError::Oracle(_) => StatusCode::BAD_GATEWAY,
            AppError::Upstream(UpstreamError::Transport(_))
            | AppError::Upstream(UpstreamError::Exhausted { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
