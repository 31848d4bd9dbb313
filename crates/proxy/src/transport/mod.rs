// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the gateway.

pub mod docs;
pub mod http;
pub mod proxy;

use std::sync::Arc;

use axum::routing::{any, get};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::ProxyState;

/// Build the axum `Router` with the wrapper endpoints and the proxied namespace.
pub fn build_router(state: Arc<ProxyState>) -> Router {
    let proxied = format!("{}/{{*rest}}", state.config.prefix());

    let mut router = Router::new()
        // Wrapper endpoints
        .route("/health", get(http::health))
        .route("/status", get(http::status))
        .route("/swagger.json", get(docs::swagger))
        .route("/api-docs", get(docs::api_docs));
    for name in docs::OPENAPI_DOCUMENTS {
        router = router.route(&format!("/{name}"), get(docs::openapi_document));
    }

    router
        // Everything under the prefix goes upstream
        .route(&proxied, any(proxy::proxy_request))
        .fallback(http::not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
