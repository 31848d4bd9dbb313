// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs the built `smproxy` binary against a fake upstream.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use smproxy::test_support::{FakeUpstream, LoginShape};

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("local addr").port()
}

fn gateway(upstream_url: &str, port: u16) -> Child {
    Command::new(env!("CARGO_BIN_EXE_smproxy"))
        .env_clear()
        .env("SMPROXY_HOST", "127.0.0.1")
        .env("SMPROXY_PORT", port.to_string())
        .env("SITEMINDER_BASE_URL", upstream_url)
        .env("SITEMINDER_USERNAME", "user")
        .env("SITEMINDER_PASSWORD", "pass")
        .env("SMPROXY_LOGIN_RETRIES", "0")
        .env("SMPROXY_INSECURE_TLS", "false")
        .env("LOG_LEVEL", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("spawn smproxy")
}

async fn wait_healthy(port: u16) -> Option<serde_json::Value> {
    smproxy::upstream::client::ensure_crypto();
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{port}/health");
    for _ in 0..100 {
        if let Ok(resp) = client.get(&url).send().await {
            return resp.json().await.ok();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    None
}

#[tokio::test]
async fn binary_serves_health_and_proxies() {
    let fake = FakeUpstream::new();
    let (url, stop) = fake.spawn().await.expect("spawn fake upstream");
    let port = free_port();
    let mut child = gateway(&url, port);

    let health = wait_healthy(port).await.expect("gateway became reachable");
    assert_eq!(health["status"], "healthy");
    assert_eq!(fake.login_calls(), 1);

    let resp = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/ca/api/sso/services/policy/v1/SmUserDirectories"))
        .send()
        .await
        .expect("proxied request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    child.kill().await.expect("kill smproxy");
    stop.cancel();
}

#[tokio::test]
async fn binary_exits_nonzero_without_initial_credential() {
    for fail_logins in [false, true] {
        let fake = FakeUpstream::new();
        fake.set_login_shape(LoginShape::Unrecognized);
        fake.set_fail_logins(fail_logins);
        let (url, stop) = fake.spawn().await.expect("spawn fake upstream");

        let mut child = gateway(&url, free_port());
        let status = tokio::time::timeout(Duration::from_secs(10), child.wait())
            .await
            .expect("smproxy exits")
            .expect("wait status");
        assert_eq!(status.code(), Some(1), "fail_logins={fail_logins}");
        assert_eq!(fake.login_calls(), 1);
        stop.cancel();
    }
}

#[tokio::test]
async fn binary_rejects_invalid_config() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_smproxy"))
        .env_clear()
        .env("SITEMINDER_BASE_URL", "ftp://not-http")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("spawn smproxy");

    let status = tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("smproxy exits")
        .expect("wait status");
    assert_eq!(status.code(), Some(2));
}
