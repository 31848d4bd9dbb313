// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential manager: holds the current credential and coalesces refreshes.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::credential::login::{fetch_with_retries, RetryPolicy};
use crate::credential::{Credential, CredentialError, CredentialSource};

type RefreshOutcome = Result<Credential, CredentialError>;

/// Handle to the one in-flight refresh. Cloned by every caller that joins it.
type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Debug, Default)]
struct RefreshStats {
    refresh_count: u64,
    last_error: Option<String>,
}

/// Snapshot of the credential state for status reporting. Never carries the secret.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialStatus {
    pub active: bool,
    pub issued_at: Option<String>,
    pub expires_at: Option<String>,
    pub refresh_count: u64,
    pub last_error: Option<String>,
}

/// Owns the process-wide upstream credential.
///
/// Readers go through [`current`](Self::current); the only writer is the
/// refresh task started by [`refresh`](Self::refresh). At most one refresh
/// task exists at a time.
pub struct CredentialManager {
    source: Arc<dyn CredentialSource>,
    retry: RetryPolicy,
    current: RwLock<Option<Credential>>,
    in_flight: Mutex<Option<InFlight>>,
    stats: Mutex<RefreshStats>,
    shutdown: CancellationToken,
}

impl CredentialManager {
    pub fn new(source: Arc<dyn CredentialSource>, retry: RetryPolicy) -> Arc<Self> {
        Arc::new(Self {
            source,
            retry,
            current: RwLock::new(None),
            in_flight: Mutex::new(None),
            stats: Mutex::new(RefreshStats::default()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Fetch the first credential. Callers treat failure as fatal.
    pub async fn initialize(self: &Arc<Self>) -> Result<Credential, CredentialError> {
        self.refresh().await
    }

    /// The most recently installed credential. No network call.
    pub fn current(&self) -> Result<Credential, CredentialError> {
        self.current.read().clone().ok_or(CredentialError::NotInitialized)
    }

    pub fn has_credential(&self) -> bool {
        self.current.read().is_some()
    }

    /// Obtain a new credential, joining the in-flight refresh if there is one.
    ///
    /// On failure the previous credential stays current.
    pub async fn refresh(self: &Arc<Self>) -> Result<Credential, CredentialError> {
        let in_flight = {
            let mut slot = self.in_flight.lock();
            match slot.as_ref() {
                Some(in_flight) => {
                    tracing::debug!("joining in-flight credential refresh");
                    in_flight.clone()
                }
                None => {
                    let in_flight = self.start_refresh();
                    *slot = Some(in_flight.clone());
                    in_flight
                }
            }
        };
        in_flight.await
    }

    /// Spawn the refresh on its own task so a cancelled caller does not abort it.
    ///
    /// Must be called with the `in_flight` slot locked.
    fn start_refresh(self: &Arc<Self>) -> InFlight {
        let manager = Arc::clone(self);
        let task = tokio::spawn(async move { manager.run_refresh().await });
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(CredentialError::unavailable(format!("refresh task failed: {e}"))),
            }
        }
        .boxed()
        .shared()
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        tracing::info!("refreshing upstream credential");
        let outcome = fetch_with_retries(self.source.as_ref(), self.retry).await;

        match &outcome {
            Ok(credential) => {
                *self.current.write() = Some(credential.clone());
                let mut stats = self.stats.lock();
                stats.refresh_count += 1;
                stats.last_error = None;
                tracing::info!(refresh_count = stats.refresh_count, "credential refreshed");
            }
            Err(e) => {
                self.stats.lock().last_error = Some(e.to_string());
                tracing::error!(err = %e, "credential refresh failed");
            }
        }

        // The outcome is installed; later callers start a new refresh.
        self.in_flight.lock().take();
        outcome
    }

    /// Start the periodic refresh timer. The first tick fires one interval from now.
    pub fn spawn_auto_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut timer = tokio::time::interval_at(start, interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = timer.tick() => {}
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    result = manager.refresh() => {
                        if let Err(e) = result {
                            tracing::warn!(
                                err = %e,
                                "scheduled refresh failed, keeping previous credential"
                            );
                        }
                    }
                }
            }

            tracing::debug!("credential auto-refresh stopped");
        })
    }

    /// Stop the background refresh timer. Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!("stopping credential auto-refresh");
        }
        self.shutdown.cancel();
    }

    pub fn status(&self) -> CredentialStatus {
        let current = self.current.read().clone();
        let stats = self.stats.lock();
        CredentialStatus {
            active: current.is_some(),
            issued_at: current.as_ref().map(|c| c.issued_at().to_rfc3339()),
            expires_at: current.as_ref().and_then(|c| c.expires_at()).map(|t| t.to_rfc3339()),
            refresh_count: stats.refresh_count,
            last_error: stats.last_error.clone(),
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
