// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wrapper-owned HTTP handlers: health, status, and the 404 fallback.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::ProxyError;
use crate::state::{timestamp, ProxyState};

const SERVICE_NAME: &str = "smproxy";

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub token_status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub upstream: UpstreamStatus,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct UpstreamStatus {
    pub base_url: String,
    pub token_status: &'static str,
    pub token_issued_at: Option<String>,
    pub token_expires_at: Option<String>,
    pub refresh_count: u64,
    pub last_refresh_error: Option<String>,
    pub token_refresh_interval: String,
}

#[derive(Debug, Serialize)]
pub struct StatusErrorResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub error: String,
    pub timestamp: String,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health(State(s): State<Arc<ProxyState>>) -> impl IntoResponse {
    if s.credentials.has_credential() {
        let body =
            HealthResponse { status: "healthy", token_status: "active", timestamp: timestamp() };
        (StatusCode::OK, Json(body))
    } else {
        let body =
            HealthResponse { status: "unhealthy", token_status: "error", timestamp: timestamp() };
        (StatusCode::SERVICE_UNAVAILABLE, Json(body))
    }
}

/// `GET /status`: health plus a configuration echo.
pub async fn status(State(s): State<Arc<ProxyState>>) -> impl IntoResponse {
    if let Err(e) = s.credentials.current() {
        let body = StatusErrorResponse {
            service: SERVICE_NAME,
            status: "error",
            error: e.to_string(),
            timestamp: timestamp(),
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    }

    let cred = s.credentials.status();
    let body = StatusResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        upstream: UpstreamStatus {
            base_url: s.upstream.base_url().to_owned(),
            token_status: if cred.active { "active" } else { "inactive" },
            token_issued_at: cred.issued_at,
            token_expires_at: cred.expires_at,
            refresh_count: cred.refresh_count,
            last_refresh_error: cred.last_error,
            token_refresh_interval: format!("{}ms", s.config.refresh_interval_ms),
        },
        timestamp: timestamp(),
    };
    Json(body).into_response()
}

/// Fallback for paths outside the proxied namespace.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    ProxyError::NotFound.to_http_response(format!("no route for {}", uri.path()))
}
