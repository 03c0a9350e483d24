use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::hub::{ConnectionError, HubError};
use crate::notification::PublishError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Connection(#[from] ConnectionError),

    #[error("Hub error: {0}")]
    Hub(#[from] HubError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Origin not allowed: {0}")]
    OriginNotAllowed(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Connection(ConnectionError::UserLimitExceeded { .. }) => {
                (StatusCode::FORBIDDEN, "CONNECTION_LIMIT")
            }
            AppError::Connection(ConnectionError::HubUnavailable) | AppError::Hub(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "HUB_UNAVAILABLE")
            }
            AppError::Publish(PublishError::Bus(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "BUS_ERROR")
            }
            AppError::Publish(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PUBLISH_ERROR"),
            AppError::OriginNotAllowed(_) => (StatusCode::FORBIDDEN, "ORIGIN_NOT_ALLOWED"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let log_message = self.to_string();

        // Server-side failures are not echoed to clients in production
        let client_message = if status.is_server_error() && is_production() {
            status
                .canonical_reason()
                .unwrap_or("Internal server error")
                .to_string()
        } else {
            log_message.clone()
        };

        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::warn!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
