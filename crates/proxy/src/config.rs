// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the smproxy gateway.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "smproxy", version, about = "Authenticating reverse proxy for the SiteMinder REST API")]
pub struct ProxyConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "SMPROXY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000, env = "SMPROXY_PORT")]
    pub port: u16,

    /// Base URL of the upstream API (identity endpoint and proxied API).
    #[arg(long, default_value = "https://casso.cx.anapartner.net", env = "SITEMINDER_BASE_URL")]
    pub upstream_url: String,

    /// Username for the upstream login (HTTP Basic).
    #[arg(long, default_value = "siteminder", env = "SITEMINDER_USERNAME")]
    pub username: String,

    /// Password for the upstream login (HTTP Basic).
    #[arg(long, default_value = "anaPassword01", env = "SITEMINDER_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Login path on the upstream, relative to the base URL.
    #[arg(long, default_value = "/ca/api/sso/services/login/v1/token", env = "SMPROXY_LOGIN_PATH")]
    pub login_path: String,

    /// Path prefix that is forwarded to the upstream.
    #[arg(long, default_value = "/ca/api/sso/services", env = "SMPROXY_PROXY_PREFIX")]
    pub proxy_prefix: String,

    /// Background credential refresh interval in milliseconds. 0 disables the timer.
    #[arg(long, default_value_t = 1_500_000, env = "SMPROXY_REFRESH_INTERVAL_MS")]
    pub refresh_interval_ms: u64,

    /// Timeout for every outbound upstream call in milliseconds.
    #[arg(long, default_value_t = 30_000, env = "SMPROXY_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Extra login attempts within one refresh before it is reported as failed.
    #[arg(long, default_value_t = 2, env = "SMPROXY_LOGIN_RETRIES")]
    pub login_retries: u32,

    /// Initial backoff between login attempts in milliseconds (doubles per attempt).
    #[arg(long, default_value_t = 1000, env = "SMPROXY_LOGIN_RETRY_DELAY_MS")]
    pub login_retry_delay_ms: u64,

    /// Skip TLS certificate verification toward the upstream (self-issued certificate).
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "SMPROXY_INSECURE_TLS"
    )]
    pub insecure_tls: bool,

    /// Refresh the credential and retry once when the upstream answers 401.
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "SMPROXY_RETRY_ON_UNAUTHORIZED"
    )]
    pub retry_on_unauthorized: bool,

    /// Largest inbound request body accepted for proxying, in bytes.
    #[arg(long, default_value_t = 10 * 1024 * 1024, env = "SMPROXY_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    /// Directory holding the pre-built `openapi*.json` documents.
    #[arg(long, default_value = ".", env = "SMPROXY_SPEC_DIR")]
    pub spec_dir: PathBuf,

    /// Log format (text or json).
    #[arg(long, default_value = "text", env = "SMPROXY_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl ProxyConfig {
    /// Check invariants that clap cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.upstream_url.starts_with("http://") || self.upstream_url.starts_with("https://"))
        {
            anyhow::bail!("--upstream-url must start with http:// or https://");
        }
        if !self.login_path.starts_with('/') {
            anyhow::bail!("--login-path must start with '/'");
        }
        if !self.proxy_prefix.starts_with('/') || self.proxy_prefix.len() < 2 {
            anyhow::bail!("--proxy-prefix must start with '/' and name a path");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("--request-timeout-ms must be greater than zero");
        }
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("unknown --log-format: {other}"),
        }
        Ok(())
    }

    /// Upstream base URL without a trailing slash.
    pub fn upstream_base(&self) -> &str {
        self.upstream_url.trim_end_matches('/')
    }

    /// Proxy prefix without a trailing slash.
    pub fn prefix(&self) -> &str {
        self.proxy_prefix.trim_end_matches('/')
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.upstream_base(), self.login_path)
    }

    /// `None` when the background refresh timer is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn login_retry_delay(&self) -> Duration {
        Duration::from_millis(self.login_retry_delay_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
