// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream login with retries.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::header::CONTENT_TYPE;

use crate::config::ProxyConfig;
use crate::credential::extract::extract_credential;
use crate::credential::{Credential, CredentialError, CredentialSource};
use crate::upstream::client::{describe, UpstreamClient};

/// Logs in with HTTP Basic auth and extracts the bearer credential from the response.
pub struct HttpLoginSource {
    client: reqwest::Client,
    login_url: String,
    username: String,
    password: String,
}

impl HttpLoginSource {
    pub fn new(upstream: &UpstreamClient, config: &ProxyConfig) -> Self {
        Self {
            client: upstream.http().clone(),
            login_url: config.login_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    async fn login(&self) -> Result<Credential, CredentialError> {
        tracing::info!(url = %self.login_url, "requesting upstream credential");

        let resp = self
            .client
            .post(&self.login_url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .map_err(|e| {
                CredentialError::unavailable(format!("login request failed: {}", describe(&e)))
            })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| {
            CredentialError::unavailable(format!("login response unreadable: {}", describe(&e)))
        })?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(CredentialError::unavailable(format!(
                "login failed ({status}): {}",
                text.trim()
            )));
        }

        let credential = extract_credential(&body)?;
        tracing::info!(len = credential.secret().len(), "upstream credential obtained");
        Ok(credential)
    }
}

impl CredentialSource for HttpLoginSource {
    fn fetch(&self) -> BoxFuture<'_, Result<Credential, CredentialError>> {
        self.login().boxed()
    }
}

/// How many extra login attempts one refresh may make, and the first backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self { retries: 0, delay: Duration::ZERO }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self { retries: config.login_retries, delay: config.login_retry_delay() }
    }
}

/// Fetch with exponential backoff retries.
pub async fn fetch_with_retries(
    source: &dyn CredentialSource,
    policy: RetryPolicy,
) -> Result<Credential, CredentialError> {
    let mut backoff = policy.delay;
    let max_backoff = Duration::from_secs(60);

    for attempt in 0..policy.retries {
        match source.fetch().await {
            Ok(credential) => return Ok(credential),
            Err(e) => {
                tracing::debug!(attempt, err = %e, "login attempt failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    source.fetch().await
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
