// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every variant carries a fixed Portuguese message for the end user; the
//! machine-readable `error` code and optional `details` are for clients and
//! logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Data API error (status {status:?}, code {code:?}): {message}")]
    Store {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error body returned by PostgREST-compatible data APIs.
#[derive(Debug, Default, Deserialize)]
pub struct StoreErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl AppError {
    /// Classify a failed data API response by status and error code.
    pub fn from_store_response(status: u16, body: &str) -> Self {
        let parsed: StoreErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .clone()
            .unwrap_or_else(|| format!("HTTP {}", status));

        match parsed.code.as_deref() {
            // unique_violation
            Some("23505") => AppError::Conflict(message),
            // RAISE EXCEPTION inside a stored procedure
            Some("P0001") => AppError::BadRequest(message),
            // .single() with zero rows
            Some("PGRST116") => AppError::NotFound(message),
            _ => AppError::Store {
                status: Some(status),
                code: parsed.code,
                message,
            },
        }
    }

    /// Wrap a transport-level failure (no HTTP status received).
    pub fn store_transport(err: impl std::fmt::Display) -> Self {
        AppError::Store {
            status: None,
            code: None,
            message: err.to_string(),
        }
    }

    /// Client-class errors are caused by the request itself and are never
    /// worth retrying.
    pub fn is_client_error(&self) -> bool {
        match self {
            AppError::Unauthorized
            | AppError::InvalidToken
            | AppError::Forbidden(_)
            | AppError::NotFound(_)
            | AppError::BadRequest(_)
            | AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::RateLimited => true,
            AppError::Store {
                status: Some(status),
                ..
            } => (400..500).contains(status) && *status != 408 && *status != 429,
            AppError::Store { status: None, .. }
            | AppError::Geocoding(_)
            | AppError::Internal(_) => false,
        }
    }

    /// Whether a retry policy may try the operation again.
    pub fn is_retryable(&self) -> bool {
        !self.is_client_error()
    }

    /// Fixed message shown to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Unauthorized | AppError::InvalidToken => {
                "Sua sessão expirou. Faça login novamente."
            }
            AppError::Forbidden(_) => "Você não tem permissão para acessar esta área.",
            AppError::NotFound(_) => "Não encontramos o que você procurava.",
            AppError::BadRequest(_) => "Não foi possível processar sua solicitação.",
            AppError::Validation(_) => "Verifique os dados informados e tente novamente.",
            AppError::Conflict(_) => "Você já possui um cupom ativo para este estabelecimento.",
            AppError::RateLimited => "Muitas tentativas. Aguarde um momento e tente novamente.",
            AppError::Store { .. } => {
                "Erro de conexão. Verifique sua internet e tente novamente."
            }
            AppError::Geocoding(_) => "Não foi possível identificar sua cidade.",
            AppError::Internal(_) => "Ocorreu um erro inesperado. Tente novamente mais tarde.",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                Some(errors.to_string()),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", None),
            AppError::Store {
                status,
                code,
                message,
            } => {
                tracing::error!(status = ?status, code = ?code, error = %message, "Data API error");
                (StatusCode::BAD_GATEWAY, "store_error", None)
            }
            AppError::Geocoding(msg) => {
                tracing::warn!(error = %msg, "Reverse geocoding failed");
                (StatusCode::BAD_GATEWAY, "geocoding_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message: self.user_message().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
