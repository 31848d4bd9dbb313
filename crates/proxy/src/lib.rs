// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! smproxy: authenticating reverse proxy for the SiteMinder REST API.
//!
//! Callers talk plain HTTP to the gateway; the gateway logs in upstream,
//! keeps the bearer credential fresh, and injects it into every forwarded
//! request.

pub mod config;
pub mod credential;
pub mod error;
pub mod state;
pub mod test_support;
pub mod transport;
pub mod upstream;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::credential::login::{HttpLoginSource, RetryPolicy};
use crate::credential::CredentialManager;
use crate::state::ProxyState;
use crate::transport::build_router;
use crate::upstream::client::UpstreamClient;

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let state = bootstrap(config, shutdown).await?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("smproxy listening on http://{addr}");
    tracing::info!("health check at http://{addr}/health, Swagger UI at http://{addr}/api-docs");
    serve(state, listener).await
}

/// Obtain the first credential and start the refresh timer.
///
/// Fails when the initial login fails: the gateway never serves without a credential.
pub async fn bootstrap(
    config: ProxyConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<Arc<ProxyState>> {
    let upstream = UpstreamClient::new(&config).context("failed to build upstream client")?;
    let source = Arc::new(HttpLoginSource::new(&upstream, &config));
    let credentials = CredentialManager::new(source, RetryPolicy::from_config(&config));

    tracing::info!(upstream = %upstream.base_url(), "initializing credential manager");
    credentials.initialize().await.context("initial credential fetch failed")?;

    match config.refresh_interval() {
        Some(interval) => {
            credentials.spawn_auto_refresh(interval);
            tracing::info!(
                interval_ms = config.refresh_interval_ms,
                "credential auto-refresh enabled"
            );
        }
        None => tracing::info!("credential auto-refresh disabled"),
    }

    Ok(Arc::new(ProxyState::new(config, credentials, upstream, shutdown)))
}

/// Serve on `listener` until the state's shutdown token fires, then stop the refresh timer.
pub async fn serve(state: Arc<ProxyState>, listener: TcpListener) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let credentials = Arc::clone(&state.credentials);
    let router = build_router(state);

    let result =
        axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await;
    credentials.shutdown();
    tracing::info!("smproxy stopped");
    result?;
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                tracing::info!("received SIGTERM, shutting down");
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                tracing::info!("received SIGINT, shutting down");
            }
            _ = shutdown.cancelled() => return,
        }
        shutdown.cancel();
    });
}
