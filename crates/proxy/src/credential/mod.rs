// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream credential lifecycle.
//!
//! One bearer credential is held per process. It is fetched once at startup,
//! then replaced by refreshes triggered either by the background timer or by
//! an upstream 401. Both triggers go through [`manager::CredentialManager::refresh`],
//! which coalesces concurrent callers into one upstream login.

pub mod extract;
pub mod login;
pub mod manager;

use std::fmt;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;

pub use manager::{CredentialManager, CredentialStatus};

/// An opaque bearer token obtained from the upstream login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into(), issued_at: Utc::now(), expires_at: None }
    }

    /// Record an expiry reported by the login response, in seconds from now.
    pub fn with_expires_in(mut self, secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        self.expires_at =
            chrono::Duration::try_seconds(secs).and_then(|d| self.issued_at.checked_add_signed(d));
        self
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// `None` when the upstream did not report an expiry.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &format_args!("<{} chars>", self.secret.len()))
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Errors from the credential layer.
///
/// `Clone` so a single coalesced refresh outcome can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No credential has been installed yet.
    NotInitialized,
    /// A login attempt failed. Any previously installed credential stays current.
    Unavailable(String),
}

impl CredentialError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("credential not initialized"),
            Self::Unavailable(msg) => write!(f, "credential unavailable: {msg}"),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Performs exactly one login against the identity endpoint.
pub trait CredentialSource: Send + Sync + 'static {
    fn fetch(&self) -> BoxFuture<'_, Result<Credential, CredentialError>>;
}
