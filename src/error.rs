// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type shared by the session store, the directory and the
/// HTTP front.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Client-side validation failed; nothing was sent to the provider.
    #[error("{0}")]
    Validation(String),

    /// Provider rejected the credentials or the account operation.
    #[error("{0}")]
    Auth(String),

    #[error("No authenticated user")]
    NotAuthenticated,

    /// Too many credential attempts from one caller.
    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds.")]
    RateLimited { retry_after_secs: u64 },

    /// Network or query failure talking to the provider.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short machine-readable kind, used in JSON bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Auth(_) => "auth_error",
            AppError::NotAuthenticated => "not_authenticated",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Fetch(_) => "fetch_error",
            AppError::Configuration(_) => "configuration_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// True for errors that were produced before any network call.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::NotAuthenticated
                | AppError::RateLimited { .. }
                | AppError::Configuration(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Fetch("Request timed out".to_string())
        } else {
            AppError::Fetch(err.to_string())
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, Some(msg.clone())),
            AppError::NotAuthenticated => (StatusCode::UNAUTHORIZED, None),
            AppError::RateLimited { retry_after_secs } => {
                let body = ErrorResponse {
                    error: self.kind().to_string(),
                    details: Some(self.to_string()),
                };
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after_secs.to_string())],
                    Json(body),
                )
                    .into_response();
            }
            AppError::Fetch(msg) => {
                tracing::warn!(error = %msg, "Provider fetch error");
                (StatusCode::BAD_GATEWAY, Some(msg.clone()))
            }
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::SERVICE_UNAVAILABLE, Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorResponse {
            error: self.kind().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for store, directory and handlers
pub type Result<T> = std::result::Result<T, AppError>;
