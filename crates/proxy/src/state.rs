// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::credential::CredentialManager;
use crate::upstream::client::UpstreamClient;

/// Shared gateway state.
pub struct ProxyState {
    pub config: ProxyConfig,
    pub credentials: Arc<CredentialManager>,
    pub upstream: UpstreamClient,
    pub shutdown: CancellationToken,
}

impl ProxyState {
    pub fn new(
        config: ProxyConfig,
        credentials: Arc<CredentialManager>,
        upstream: UpstreamClient,
        shutdown: CancellationToken,
    ) -> Self {
        Self { config, credentials, upstream, shutdown }
    }
}

/// Current UTC time as RFC 3339.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
