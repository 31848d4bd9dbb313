// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted credential sources and an in-process fake upstream.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::credential::login::RetryPolicy;
use crate::credential::{Credential, CredentialError, CredentialManager, CredentialSource};
use crate::state::ProxyState;
use crate::upstream::client::UpstreamClient;

/// Extension trait to convert any `Display` error into `anyhow::Error`.
pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}

pub fn ok(secret: &str) -> Result<Credential, CredentialError> {
    Ok(Credential::new(secret))
}

pub fn fail(message: &str) -> Result<Credential, CredentialError> {
    Err(CredentialError::unavailable(message))
}

/// A credential source that replays a fixed list of outcomes and counts calls.
///
/// With a gate, each fetch consumes one semaphore permit before answering.
pub struct ScriptedSource {
    outcomes: Mutex<VecDeque<Result<Credential, CredentialError>>>,
    calls: AtomicU32,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSource {
    pub fn new(outcomes: Vec<Result<Credential, CredentialError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicU32::new(0),
            gate: None,
        })
    }

    pub fn gated(
        outcomes: Vec<Result<Credential, CredentialError>>,
        gate: Arc<Semaphore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicU32::new(0),
            gate: Some(gate),
        })
    }

    /// Number of fetches started so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialSource for ScriptedSource {
    fn fetch(&self) -> BoxFuture<'_, Result<Credential, CredentialError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref gate) = self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            self.outcomes.lock().pop_front().unwrap_or_else(|| fail("script exhausted"))
        }
        .boxed()
    }
}

/// Manager over `source` with no login retries.
pub fn manager(source: Arc<ScriptedSource>) -> Arc<CredentialManager> {
    CredentialManager::new(source, RetryPolicy::none())
}

/// Config pointed at `upstream_url` with timers and retries off.
pub fn test_config(upstream_url: &str) -> ProxyConfig {
    ProxyConfig {
        host: "127.0.0.1".into(),
        port: 0,
        upstream_url: upstream_url.to_owned(),
        username: "user".into(),
        password: "pass".into(),
        login_path: "/ca/api/sso/services/login/v1/token".into(),
        proxy_prefix: "/ca/api/sso/services".into(),
        refresh_interval_ms: 0,
        request_timeout_ms: 2000,
        login_retries: 0,
        login_retry_delay_ms: 0,
        insecure_tls: false,
        retry_on_unauthorized: true,
        max_body_bytes: 1024 * 1024,
        spec_dir: PathBuf::from("."),
        log_format: "text".into(),
        log_level: "debug".into(),
    }
}

pub fn test_state(
    config: ProxyConfig,
    credentials: Arc<CredentialManager>,
) -> anyhow::Result<Arc<ProxyState>> {
    let upstream = UpstreamClient::new(&config)?;
    Ok(Arc::new(ProxyState::new(config, credentials, upstream, CancellationToken::new())))
}

/// URL of a local port with nothing listening on it.
pub fn unused_port_url() -> anyhow::Result<String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(format!("http://127.0.0.1:{port}"))
}

/// Serve `router` on an ephemeral local port. Stops when the returned token is cancelled.
pub async fn spawn_router(router: Router) -> anyhow::Result<(String, CancellationToken)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).with_graceful_shutdown(stop.cancelled_owned()).await;
    });
    Ok((url, cancel))
}

// -- Fake upstream ------------------------------------------------------------

/// Shape of the fake login response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginShape {
    SessionKey,
    Token,
    Bare,
    Unrecognized,
}

/// One request as seen by the fake upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// In-process stand-in for the upstream API.
///
/// Logins issue `tok-1`, `tok-2`, ... API calls succeed only with a token that
/// is still valid; [`revoke_all`](Self::revoke_all) invalidates every issued token.
#[derive(Debug)]
pub struct FakeUpstream {
    login_calls: AtomicU32,
    api_calls: AtomicU32,
    valid: Mutex<HashSet<String>>,
    reject_all: AtomicBool,
    fail_logins: AtomicBool,
    login_shape: Mutex<LoginShape>,
    login_gate: Mutex<Option<Arc<Semaphore>>>,
    api_delay: Mutex<Option<Duration>>,
    last_login: Mutex<Option<Recorded>>,
    last_api: Mutex<Option<Recorded>>,
}

impl FakeUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            login_calls: AtomicU32::new(0),
            api_calls: AtomicU32::new(0),
            valid: Mutex::new(HashSet::new()),
            reject_all: AtomicBool::new(false),
            fail_logins: AtomicBool::new(false),
            login_shape: Mutex::new(LoginShape::SessionKey),
            login_gate: Mutex::new(None),
            api_delay: Mutex::new(None),
            last_login: Mutex::new(None),
            last_api: Mutex::new(None),
        })
    }

    /// Serve the fake on an ephemeral port. Returns its base URL and a stop token.
    pub async fn spawn(self: &Arc<Self>) -> anyhow::Result<(String, CancellationToken)> {
        let router = Router::new()
            .route("/ca/api/sso/services/login/v1/token", post(fake_login))
            .route("/ca/api/sso/services/v1/api-doc/CA.SM.json", get(fake_swagger))
            .route("/ca/api/sso/services/{*rest}", any(fake_api))
            .with_state(Arc::clone(self));
        spawn_router(router).await
    }

    pub fn login_calls(&self) -> u32 {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn api_calls(&self) -> u32 {
        self.api_calls.load(Ordering::SeqCst)
    }

    pub fn revoke_all(&self) {
        self.valid.lock().clear();
    }

    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    pub fn set_fail_logins(&self, fail: bool) {
        self.fail_logins.store(fail, Ordering::SeqCst);
    }

    pub fn set_login_shape(&self, shape: LoginShape) {
        *self.login_shape.lock() = shape;
    }

    /// Hold every later login until `gate` hands out a permit (one per login).
    pub fn set_login_gate(&self, gate: Option<Arc<Semaphore>>) {
        *self.login_gate.lock() = gate;
    }

    /// Delay every API response by `delay`.
    pub fn set_api_delay(&self, delay: Option<Duration>) {
        *self.api_delay.lock() = delay;
    }

    pub fn last_login(&self) -> Option<Recorded> {
        self.last_login.lock().clone()
    }

    pub fn last_api(&self) -> Option<Recorded> {
        self.last_api.lock().clone()
    }
}

async fn record(req: Request<Body>) -> Recorded {
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    Recorded {
        method: parts.method,
        uri: parts.uri.path_and_query().map(|pq| pq.to_string()).unwrap_or_default(),
        headers: parts.headers,
        body,
    }
}

async fn fake_login(State(f): State<Arc<FakeUpstream>>, req: Request<Body>) -> Response {
    let n = f.login_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let recorded = record(req).await;
    *f.last_login.lock() = Some(recorded);

    let gate = f.login_gate.lock().clone();
    if let Some(gate) = gate {
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
    }

    if f.fail_logins.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "identity service down").into_response();
    }

    let token = format!("tok-{n}");
    f.valid.lock().insert(token.clone());
    let shape = *f.login_shape.lock();
    match shape {
        LoginShape::SessionKey => Json(serde_json::json!({ "sessionkey": token })).into_response(),
        LoginShape::Token => Json(serde_json::json!({ "token": token })).into_response(),
        LoginShape::Bare => token.into_response(),
        LoginShape::Unrecognized => Json(serde_json::json!({ "session": token })).into_response(),
    }
}

async fn fake_api(State(f): State<Arc<FakeUpstream>>, req: Request<Body>) -> Response {
    f.api_calls.fetch_add(1, Ordering::SeqCst);
    let recorded = record(req).await;
    *f.last_api.lock() = Some(recorded.clone());

    let delay = *f.api_delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let token = recorded.header("authorization").and_then(|v| v.strip_prefix("Bearer "));
    let accepted = !f.reject_all.load(Ordering::SeqCst)
        && token.is_some_and(|t| f.valid.lock().contains(t));
    if !accepted {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": "invalid session" })))
            .into_response();
    }

    let echo = serde_json::json!({
        "method": recorded.method.as_str(),
        "uri": recorded.uri,
        "body": String::from_utf8_lossy(&recorded.body),
    });
    (StatusCode::OK, [("x-upstream", "fake")], Json(echo)).into_response()
}

async fn fake_swagger(uri: Uri) -> impl IntoResponse {
    Json(serde_json::json!({
        "swagger": "2.0",
        "host": "upstream.example",
        "basePath": "/elsewhere",
        "schemes": ["https"],
        "securityDefinitions": { "basic": { "type": "basic" } },
        "security": [{ "basic": [] }],
        "paths": {},
        "x-served-from": uri.path(),
    }))
}
