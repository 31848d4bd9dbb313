// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn upstream_response() -> anyhow::Result<reqwest::Response> {
    let resp = axum::http::Response::builder()
        .status(StatusCode::CREATED)
        .header("content-type", "application/json")
        .header("x-upstream", "fake")
        .header("connection", "keep-alive")
        .header("keep-alive", "timeout=5")
        .header("transfer-encoding", "chunked")
        .body("{\"id\":7}")?;
    Ok(reqwest::Response::from(resp))
}

#[tokio::test]
async fn relay_keeps_status_body_and_end_to_end_headers() -> anyhow::Result<()> {
    let relayed = relay(upstream_response()?).await.map_err(|f| anyhow::anyhow!(f.message))?;

    assert_eq!(relayed.status(), StatusCode::CREATED);
    let headers = relayed.headers();
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    assert_eq!(header("content-type"), Some("application/json"));
    assert_eq!(header("x-upstream"), Some("fake"));

    let body = axum::body::to_bytes(relayed.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"{\"id\":7}");
    Ok(())
}

#[tokio::test]
async fn relay_strips_hop_by_hop_headers() -> anyhow::Result<()> {
    let relayed = relay(upstream_response()?).await.map_err(|f| anyhow::anyhow!(f.message))?;

    let headers = relayed.headers();
    assert!(headers.get("transfer-encoding").is_none());
    assert!(headers.get("connection").is_none());
    assert!(headers.get("keep-alive").is_none());
    Ok(())
}
