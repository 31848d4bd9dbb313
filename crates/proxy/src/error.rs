// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::credential::CredentialError;

/// Error codes for the gateway's HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyError {
    NotInitialized,
    CredentialUnavailable,
    UpstreamUnreachable,
    /// Upstream answered 401. Log-only: it triggers the single retry, and the
    /// upstream's own 401 response is what reaches the caller.
    AuthenticationRejected,
    BadRequest,
    PayloadTooLarge,
    NotFound,
    Internal,
}

impl ProxyError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotInitialized => 503,
            Self::CredentialUnavailable => 502,
            Self::UpstreamUnreachable => 502,
            Self::AuthenticationRejected => 401,
            Self::BadRequest => 400,
            Self::PayloadTooLarge => 413,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::CredentialUnavailable => "CREDENTIAL_UNAVAILABLE",
            Self::UpstreamUnreachable => "UPSTREAM_UNREACHABLE",
            Self::AuthenticationRejected => "AUTHENTICATION_REJECTED",
            Self::BadRequest => "BAD_REQUEST",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody {
            code: self.as_str().to_owned(),
            message: message.into(),
            timestamp: crate::state::timestamp(),
        }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&CredentialError> for ProxyError {
    fn from(err: &CredentialError) -> Self {
        match err {
            CredentialError::NotInitialized => Self::NotInitialized,
            CredentialError::Unavailable(_) => Self::CredentialUnavailable,
        }
    }
}

/// A request-scoped failure: an error code plus the human-readable cause.
#[derive(Debug, Clone)]
pub struct Failure {
    pub code: ProxyError,
    pub message: String,
}

impl Failure {
    pub fn new(code: ProxyError, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<CredentialError> for Failure {
    fn from(err: CredentialError) -> Self {
        Self { code: ProxyError::from(&err), message: err.to_string() }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        self.code.to_http_response(self.message).into_response()
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code, human-readable message, and RFC 3339 timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
