// ABOUTME: Unified error handling with standard error codes and HTTP responses
// ABOUTME: Maps resolution failures to the 401/403/404/429/500 rejection taxonomy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Unified Error Handling
//!
//! Every rejection the gateway produces flows through [`AppError`]. Errors
//! carry a machine-readable [`ErrorCode`] and map onto a fixed HTTP taxonomy:
//! missing credentials on a protected path become 401, an unknown tenant 404,
//! an inactive tenant 403 (with the actual status string for operator
//! diagnosis), an exhausted quota 429 (with a retry-after hint), and anything
//! unexpected a generic 500 whose detail is logged server-side only.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Convenient result alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error codes included in rejection bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No resolvable tenant context on a protected path
    AuthenticationRequired,
    /// Resolved tenant id does not exist
    TenantNotFound,
    /// Tenant exists but is not active
    TenantInactive,
    /// Per-tenant quota exhausted for the current window
    RateLimitExceeded,
    /// Request input could not be parsed or validated
    InvalidInput,
    /// Storage-layer failure
    DatabaseError,
    /// Missing or malformed configuration
    ConfigError,
    /// Any other unexpected failure
    InternalError,
}

impl ErrorCode {
    /// Short identifier used in the JSON `error` field
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::TenantNotFound => "tenant_not_found",
            Self::TenantInactive => "tenant_inactive",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InvalidInput => "invalid_input",
            Self::DatabaseError => "database_error",
            Self::ConfigError => "config_error",
            Self::InternalError => "internal_error",
        }
    }
}

/// Application error type for all gateway operations
#[derive(Debug, Error)]
pub enum AppError {
    /// Request carried no resolvable credentials for a protected path
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// Lookup target does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Tenant resolved but its status forbids serving the request
    #[error("tenant is {status}")]
    TenantInactive {
        /// The tenant's actual status string, surfaced for diagnosis
        status: String,
    },

    /// Quota met or exceeded for the current window
    #[error("rate limit exceeded: {limit} requests per {window_seconds}s")]
    RateLimited {
        /// Quota for the window that rejected the request
        limit: u64,
        /// Window length in seconds (60 or 3600)
        window_seconds: u64,
        /// Seconds until the window boundary
        retry_after_seconds: u64,
    },

    /// Malformed request input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Storage-layer failure
    #[error("database error: {0}")]
    Database(String),

    /// Configuration failure at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// No resolvable tenant context on a protected path
    pub fn auth_required(msg: impl Into<String>) -> Self {
        Self::AuthRequired(msg.into())
    }

    /// Lookup target does not exist
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Tenant exists but is not active; carries the actual status string
    pub fn tenant_inactive(status: impl Into<String>) -> Self {
        Self::TenantInactive {
            status: status.into(),
        }
    }

    /// Quota met or exceeded for the current window
    #[must_use]
    pub const fn rate_limited(limit: u64, window_seconds: u64, retry_after_seconds: u64) -> Self {
        Self::RateLimited {
            limit,
            window_seconds,
            retry_after_seconds,
        }
    }

    /// Malformed request input
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Storage-layer failure
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Configuration failure
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Unexpected internal failure
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine-readable code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AuthRequired(_) => ErrorCode::AuthenticationRequired,
            Self::NotFound(_) => ErrorCode::TenantNotFound,
            Self::TenantInactive { .. } => ErrorCode::TenantInactive,
            Self::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TenantInactive { .. } => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to echo to the caller
    ///
    /// Internal detail (database errors, unexpected failures) is replaced
    /// with a generic message; the full error is logged server-side instead.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::AuthRequired(msg) => msg.clone(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::TenantInactive { status } => format!("Tenant is {status}"),
            Self::RateLimited {
                retry_after_seconds,
                ..
            } => format!("Rate limit exceeded, retry in {retry_after_seconds} seconds"),
            Self::InvalidInput(msg) => msg.clone(),
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                "An internal error occurred".to_owned()
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        Self::Database(format!("counter store: {err}"))
    }
}

/// JSON body for every rejection response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request rejected with internal error");
        }

        let retry_after = match &self {
            Self::RateLimited {
                retry_after_seconds,
                ..
            } => Some(*retry_after_seconds),
            _ => None,
        };

        let body = ErrorBody {
            error: self.code().as_str(),
            message: self.client_message(),
            retry_after_seconds: retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = header::HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
