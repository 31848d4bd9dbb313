// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the single upstream API.

use std::error::Error as _;
use std::sync::Once;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;

use crate::config::ProxyConfig;
use crate::upstream::ProxiedRequest;

const DEFAULT_CONTENT_TYPE: &str = "application/json";

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times, only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Render a reqwest error together with its source chain.
///
/// reqwest's own `Display` hides the underlying cause (connection refused,
/// DNS failure), which is what callers need to see.
pub fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    if err.is_timeout() && !message.contains("timed out") {
        message.push_str(" (timed out)");
    }
    message
}

/// HTTP client wrapper for the upstream API.
#[derive(Clone)]
pub struct UpstreamClient {
    base_url: String,
    client: Client,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> anyhow::Result<Self> {
        ensure_crypto();
        if config.insecure_tls {
            tracing::warn!("TLS certificate verification toward the upstream is disabled");
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()?;
        Ok(Self { base_url: config.upstream_base().to_owned(), client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying client, shared with the login source.
    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    /// Send one outbound copy of `req` carrying `credential` as the bearer token.
    ///
    /// Only content-type (defaulting to JSON) and accept are carried over from
    /// the inbound headers. Any status is returned as `Ok`.
    pub async fn send(
        &self,
        req: &ProxiedRequest,
        credential: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let content_type = req
            .headers
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| reqwest::header::HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

        let mut builder = self
            .client
            .request(req.method.clone(), self.url(&req.path_and_query))
            .header(CONTENT_TYPE, content_type)
            .bearer_auth(credential);
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }
        if let Some(accept) = req.headers.get(ACCEPT) {
            builder = builder.header(ACCEPT, accept.clone());
        }

        builder.send().await
    }

    /// GET a JSON document from the upstream without credentials.
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value, reqwest::Error> {
        let resp = self.client.get(self.url(path)).send().await?;
        resp.error_for_status()?.json().await
    }
}
