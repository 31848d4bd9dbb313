// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::ProxyConfig;

fn parse(args: &[&str]) -> ProxyConfig {
    ProxyConfig::parse_from(args)
}

#[test]
fn defaults_are_valid() -> anyhow::Result<()> {
    let config = parse(&["smproxy"]);
    config.validate()?;
    assert_eq!(config.port, 3000);
    assert!(config.insecure_tls);
    assert!(config.retry_on_unauthorized);
    assert_eq!(
        config.login_url(),
        "https://casso.cx.anapartner.net/ca/api/sso/services/login/v1/token"
    );
    assert_eq!(config.refresh_interval(), Some(Duration::from_secs(25 * 60)));
    Ok(())
}

#[test]
fn zero_refresh_interval_disables_timer() -> anyhow::Result<()> {
    let config = parse(&["smproxy", "--refresh-interval-ms", "0"]);
    config.validate()?;
    assert_eq!(config.refresh_interval(), None);
    Ok(())
}

#[test]
fn boolean_switches_accept_explicit_values() -> anyhow::Result<()> {
    let config =
        parse(&["smproxy", "--insecure-tls", "false", "--retry-on-unauthorized", "false"]);
    config.validate()?;
    assert!(!config.insecure_tls);
    assert!(!config.retry_on_unauthorized);
    Ok(())
}

#[test]
fn trailing_slashes_are_trimmed() -> anyhow::Result<()> {
    let config = parse(&[
        "smproxy",
        "--upstream-url",
        "http://upstream:8080/",
        "--proxy-prefix",
        "/api/",
    ]);
    config.validate()?;
    assert_eq!(config.upstream_base(), "http://upstream:8080");
    assert_eq!(config.prefix(), "/api");
    assert_eq!(config.login_url(), "http://upstream:8080/ca/api/sso/services/login/v1/token");
    Ok(())
}

#[yare::parameterized(
    bad_scheme     = { &["smproxy", "--upstream-url", "ftp://upstream"], "http:// or https://" },
    relative_login = { &["smproxy", "--login-path", "login"], "--login-path" },
    root_prefix    = { &["smproxy", "--proxy-prefix", "/"], "--proxy-prefix" },
    zero_timeout   = { &["smproxy", "--request-timeout-ms", "0"], "greater than zero" },
    bad_log_format = { &["smproxy", "--log-format", "xml"], "unknown --log-format" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    match config.validate() {
        Ok(()) => unreachable!("expected validation error for {args:?}"),
        Err(e) => {
            let msg = e.to_string();
            assert!(msg.contains(expected_substr), "expected {expected_substr:?}, got: {msg:?}");
        }
    }
}
