// ABOUTME: Unified error handling with standard error codes and HTTP responses
// ABOUTME: Maps the service error taxonomy onto status codes for every route handler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Convenient result alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// Standard error codes for the service error taxonomy
///
/// The taxonomy distinguishes validation failures (rejected before any
/// write), permission failures (403, no retry implied), missing resources
/// (404), illegal workflow transitions (409), and storage/internal faults
/// (500).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No credentials were supplied
    AuthRequired,
    /// Credentials were supplied but are not valid
    AuthInvalid,
    /// Credentials were valid but have expired
    AuthExpired,
    /// The authenticated actor may not perform this operation
    PermissionDenied,
    /// The referenced resource does not exist
    ResourceNotFound,
    /// A required field is missing from the request
    MissingRequiredField,
    /// A supplied value is not acceptable
    InvalidInput,
    /// A supplied value has the wrong shape (e.g. unparseable date)
    InvalidFormat,
    /// The operation is not legal in the resource's current state
    InvalidState,
    /// A database operation failed
    DatabaseError,
    /// Server configuration is invalid
    ConfigError,
    /// An unexpected internal fault
    InternalError,
}

impl ErrorCode {
    /// HTTP status this code maps to
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::AuthRequired | Self::AuthInvalid | Self::AuthExpired => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::ResourceNotFound => StatusCode::NOT_FOUND,
            Self::MissingRequiredField | Self::InvalidInput | Self::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidState => StatusCode::CONFLICT,
            Self::DatabaseError | Self::ConfigError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable identifier used in response bodies
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::AuthInvalid => "auth_invalid",
            Self::AuthExpired => "auth_expired",
            Self::PermissionDenied => "permission_denied",
            Self::ResourceNotFound => "resource_not_found",
            Self::MissingRequiredField => "missing_required_field",
            Self::InvalidInput => "invalid_input",
            Self::InvalidFormat => "invalid_format",
            Self::InvalidState => "invalid_state",
            Self::DatabaseError => "database_error",
            Self::ConfigError => "config_error",
            Self::InternalError => "internal_error",
        }
    }
}

/// Application error carrying a code and a human-readable message
#[derive(Debug, Clone, Error)]
#[error("{}: {message}", .code.as_str())]
pub struct AppError {
    /// Error classification
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
}

impl AppError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Database operation failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Unexpected internal fault
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Invalid request input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Missing resource; the resource name is embedded in the message
    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::new(ErrorCode::ResourceNotFound, format!("{resource} not found"))
    }

    /// Invalid or missing credentials
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Operation not legal in the resource's current state
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    /// Server configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }
}

/// JSON body returned for every error response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.http_status();
        if status.is_server_error() {
            tracing::error!(code = self.code.as_str(), "{}", self.message);
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.as_str(),
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization failed: {e}"))
    }
}

impl From<uuid::Error> for AppError {
    fn from(e: uuid::Error) -> Self {
        Self::database(format!("Failed to parse UUID: {e}"))
    }
}
