// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serves API description documents. Nothing here generates them.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::HOST;
use axum::http::{HeaderMap, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::error::{Failure, ProxyError};
use crate::state::ProxyState;
use crate::upstream::client::describe;

/// Pre-built OpenAPI 3 documents served from `--spec-dir`.
pub const OPENAPI_DOCUMENTS: &[&str] = &[
    "openapi.json",
    "openapi-minimal.json",
    "openapi-lite.json",
    "openapi-medium.json",
    "openapi-large.json",
    "openapi-full.json",
];

const SERVER_DESCRIPTION: &str = "SiteMinder API Wrapper";

/// Embedded Swagger UI page.
const API_DOCS_HTML: &str = include_str!("../../web/api-docs.html");

/// External host:port the caller used to reach us.
fn request_host(state: &ProxyState, headers: &HeaderMap) -> String {
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{}:{}", state.config.host, state.config.port))
}

/// `GET /openapi*.json`: read the document and point its `servers` at this gateway.
pub async fn openapi_document(
    State(s): State<Arc<ProxyState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let name = uri.path().trim_start_matches('/');
    match load_openapi(&s, name, &request_host(&s, &headers)).await {
        Ok(doc) => Json(doc).into_response(),
        Err(failure) => {
            tracing::error!(document = name, err = %failure.message, "openapi load failed");
            failure.into_response()
        }
    }
}

async fn load_openapi(state: &ProxyState, name: &str, host: &str) -> Result<Value, Failure> {
    let internal = |msg: String| Failure::new(ProxyError::Internal, msg);

    let path = state.config.spec_dir.join(name);
    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| internal(format!("failed to load {name}: {e}")))?;
    let mut doc: Value =
        serde_json::from_str(&contents).map_err(|e| internal(format!("invalid {name}: {e}")))?;

    let obj =
        doc.as_object_mut().ok_or_else(|| internal(format!("invalid {name}: not a JSON object")))?;
    obj.insert(
        "servers".to_owned(),
        json!([{ "url": format!("http://{host}"), "description": SERVER_DESCRIPTION }]),
    );
    Ok(doc)
}

/// `GET /swagger.json`: the upstream's Swagger 2.0 document, re-pointed at this gateway.
pub async fn swagger(State(s): State<Arc<ProxyState>>, headers: HeaderMap) -> Response {
    let path = format!("{}/v1/api-doc/CA.SM.json", s.config.prefix());
    tracing::info!(path = %path, "fetching upstream Swagger document");

    let mut spec = match s.upstream.get_json(&path).await {
        Ok(spec) => spec,
        Err(e) => {
            let msg = format!("failed to fetch Swagger specification: {}", describe(&e));
            tracing::error!(err = %msg, "swagger fetch failed");
            return ProxyError::UpstreamUnreachable.to_http_response(msg).into_response();
        }
    };

    let Some(obj) = spec.as_object_mut() else {
        return ProxyError::UpstreamUnreachable
            .to_http_response("upstream Swagger document is not a JSON object")
            .into_response();
    };
    obj.insert("host".to_owned(), Value::String(request_host(&s, &headers)));
    obj.insert("basePath".to_owned(), Value::String(s.config.prefix().to_owned()));
    obj.insert("schemes".to_owned(), json!(["http"]));
    // The gateway handles authentication; callers must not try to.
    obj.remove("securityDefinitions");
    obj.remove("security");

    Json(spec).into_response()
}

/// `GET /api-docs`
pub async fn api_docs() -> Html<&'static str> {
    Html(API_DOCS_HTML)
}

#[cfg(test)]
#[path = "docs_tests.rs"]
mod tests;
