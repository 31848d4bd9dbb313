// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream communication: HTTP client and the captured request snapshot.

pub mod client;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH};
use axum::http::{HeaderMap, Method, Request};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::error::{Failure, ProxyError};

fn too_large(max_body_bytes: usize) -> Failure {
    Failure::new(
        ProxyError::PayloadTooLarge,
        format!("request body exceeds {max_body_bytes} bytes"),
    )
}

/// Immutable snapshot of an inbound request, taken once on entry.
///
/// Every outbound attempt (including the 401 retry) is built from this.
#[derive(Debug, Clone)]
pub struct ProxiedRequest {
    pub method: Method,
    pub path_and_query: String,
    /// Inbound headers without `authorization`.
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxiedRequest {
    /// Buffer the body (up to `max_body_bytes`) and record the rest of the request.
    ///
    /// An oversized body is 413 whether it is declared by `content-length` or
    /// only discovered while streaming.
    pub async fn capture(req: Request<Body>, max_body_bytes: usize) -> Result<Self, Failure> {
        let (parts, body) = req.into_parts();

        let declared = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > max_body_bytes) {
            return Err(too_large(max_body_bytes));
        }

        let mut buf = BytesMut::new();
        let mut stream = body.into_data_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                Failure::new(ProxyError::BadRequest, format!("failed to read request body: {e}"))
            })?;
            if buf.len() + chunk.len() > max_body_bytes {
                return Err(too_large(max_body_bytes));
            }
            buf.extend_from_slice(&chunk);
        }
        let body = buf.freeze();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| parts.uri.path().to_owned());

        let mut headers = parts.headers;
        headers.remove(AUTHORIZATION);

        Ok(Self { method: parts.method, path_and_query, headers, body })
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
