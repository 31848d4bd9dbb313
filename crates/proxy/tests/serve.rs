// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end: bootstrap and serve on a real listener, then shut down.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use smproxy::test_support::{test_config, unused_port_url, FakeUpstream};

#[tokio::test]
async fn serves_until_shutdown() {
    let fake = FakeUpstream::new();
    let (url, stop_fake) = fake.spawn().await.expect("spawn fake upstream");

    let shutdown = CancellationToken::new();
    let state = smproxy::bootstrap(test_config(&url), shutdown.clone()).await.expect("bootstrap");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(smproxy::serve(state, listener));

    let client = reqwest::Client::new();
    let health: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("health request")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["status"], "healthy");

    let resp = client
        .get(format!("http://{addr}/ca/api/sso/services/policy/v1/SmAgents"))
        .send()
        .await
        .expect("proxied request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(fake.api_calls(), 1);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops")
        .expect("server task")
        .expect("serve result");
    stop_fake.cancel();
}

#[tokio::test]
async fn bootstrap_fails_without_initial_credential() {
    let fake = FakeUpstream::new();
    fake.set_fail_logins(true);
    let (url, stop_fake) = fake.spawn().await.expect("spawn fake upstream");

    let mut config = test_config(&url);
    config.login_retries = 1;
    config.login_retry_delay_ms = 1;
    let err = smproxy::bootstrap(config, CancellationToken::new())
        .await
        .err()
        .expect("bootstrap should fail");
    let message = format!("{err:#}");
    assert!(message.starts_with("initial credential fetch failed"), "got {message}");
    assert!(message.contains("identity service down"), "got {message}");
    assert_eq!(fake.login_calls(), 2);
    stop_fake.cancel();
}

#[tokio::test]
async fn bootstrap_fails_when_upstream_is_unreachable() {
    let config = test_config(&unused_port_url().expect("port"));
    let result = smproxy::bootstrap(config, CancellationToken::new()).await;
    assert!(result.is_err());
}
