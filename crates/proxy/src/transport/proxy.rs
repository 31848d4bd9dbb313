// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticating reverse proxy handler.
//!
//! Per request: snapshot → current credential → send → on 401 refresh and
//! resend once → relay the final upstream response. A second 401 is relayed
//! like any other response.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::error::{Failure, ProxyError};
use crate::state::ProxyState;
use crate::upstream::client::describe;
use crate::upstream::ProxiedRequest;

/// `ANY {proxy_prefix}/*`: forward to the upstream with the injected credential.
pub async fn proxy_request(State(s): State<Arc<ProxyState>>, req: Request<Body>) -> Response {
    let span = tracing::info_span!(
        "proxy",
        request_id = %uuid::Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    handle(&s, req).instrument(span).await
}

/// Run one inbound request through the proxy. Never fails: errors become responses.
pub async fn handle(state: &ProxyState, req: Request<Body>) -> Response {
    match forward(state, req).await {
        Ok(resp) => resp,
        Err(failure) => {
            tracing::error!(code = %failure.code, err = %failure.message, "proxy request failed");
            failure.into_response()
        }
    }
}

async fn forward(state: &ProxyState, req: Request<Body>) -> Result<Response, Failure> {
    let snapshot = ProxiedRequest::capture(req, state.config.max_body_bytes).await?;
    let credential = state.credentials.current()?;

    let upstream_url = state.upstream.url(&snapshot.path_and_query);
    tracing::info!(%upstream_url, "proxying request");
    let mut resp = send(state, &snapshot, credential.secret()).await?;
    tracing::debug!(status = %resp.status(), "upstream responded");

    if resp.status() == StatusCode::UNAUTHORIZED && state.config.retry_on_unauthorized {
        tracing::warn!(
            code = %ProxyError::AuthenticationRejected,
            "upstream rejected credential, refreshing and retrying"
        );
        let refreshed = state.credentials.refresh().await?;
        resp = send(state, &snapshot, refreshed.secret()).await?;
        tracing::info!(status = %resp.status(), "retry response");
    }

    relay(resp).await
}

async fn send(
    state: &ProxyState,
    snapshot: &ProxiedRequest,
    credential: &str,
) -> Result<reqwest::Response, Failure> {
    state.upstream.send(snapshot, credential).await.map_err(|e| {
        Failure::new(
            ProxyError::UpstreamUnreachable,
            format!("failed to reach upstream: {}", describe(&e)),
        )
    })
}

/// Connection-scoped headers that describe the upstream hop, not the payload.
const HOP_BY_HOP: [&str; 4] =
    ["connection", "keep-alive", "proxy-connection", "transfer-encoding"];

/// Copy status, end-to-end headers, and body back to the caller.
async fn relay(resp: reqwest::Response) -> Result<Response, Failure> {
    let status = resp.status();
    let mut headers = resp.headers().clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }

    let body = resp.bytes().await.map_err(|e| {
        Failure::new(
            ProxyError::UpstreamUnreachable,
            format!("failed to read upstream response: {}", describe(&e)),
        )
    })?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
