// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process mock of the platform's auth endpoints.
//!
//! Every endpoint counts its calls. Poll and refresh answer from a scripted
//! queue first and fall back to a default response once it is drained.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use playkit::config::{AuthMode, SdkConfig, StorageKind};
use playkit::credential::crypto::Capabilities;
use playkit::credential::platform::FixedPlatformToken;
use playkit::credential::presenter::{NoopOpener, SilentPresenter};
use playkit::credential::session::SessionManager;
use playkit::credential::store::{CredentialStore, KeyValueStore, MemoryStore};
use playkit::credential::{epoch_ms, Session, TokenKind};

pub type Reply = (u16, Value);

pub fn authorized_body() -> Value {
    json!({
        "status": "authorized",
        "accessToken": "access-device",
        "tokenType": "Bearer",
        "expiresInSeconds": 3600,
        "refreshToken": "refresh-device",
        "refreshExpiresInSeconds": 2_592_000,
        "scope": "player:play",
    })
}

pub fn pending_body() -> Value {
    json!({ "status": "pending" })
}

pub fn error_body(code: &str) -> Value {
    json!({ "error": code, "errorDescription": format!("{code} from mock") })
}

pub struct MockState {
    pub initiate_calls: AtomicU32,
    pub poll_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub exchange_calls: AtomicU32,
    pub player_info_calls: AtomicU32,

    pub initiate_response: Mutex<Reply>,
    pub initiate_delay: Mutex<Duration>,
    pub poll_script: Mutex<VecDeque<Reply>>,
    pub poll_default: Mutex<Reply>,
    pub refresh_script: Mutex<VecDeque<Reply>>,
    pub refresh_default: Mutex<Reply>,
    pub refresh_delay: Mutex<Duration>,
    pub exchange_response: Mutex<Reply>,
    pub player_info_response: Mutex<Reply>,

    pub last_initiate_body: Mutex<Option<Value>>,
    pub last_poll_query: Mutex<Option<HashMap<String, String>>>,
    pub last_refresh_body: Mutex<Option<Value>>,
    pub last_exchange_body: Mutex<Option<Value>>,
    pub last_bearer: Mutex<Option<String>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            initiate_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            exchange_calls: AtomicU32::new(0),
            player_info_calls: AtomicU32::new(0),
            initiate_response: Mutex::new((
                200,
                json!({
                    "sessionId": "sess-1",
                    "authorizationUrl": "https://playkit.test/device?code=ABC",
                    "pollIntervalSeconds": 1,
                    "expiresInSeconds": 600,
                }),
            )),
            initiate_delay: Mutex::new(Duration::ZERO),
            poll_script: Mutex::new(VecDeque::new()),
            poll_default: Mutex::new((200, authorized_body())),
            refresh_script: Mutex::new(VecDeque::new()),
            refresh_default: Mutex::new((
                200,
                json!({
                    "accessToken": "access-refreshed",
                    "tokenType": "Bearer",
                    "expiresInSeconds": 3600,
                    "refreshToken": "refresh-rotated",
                    "refreshExpiresInSeconds": 2_592_000,
                }),
            )),
            refresh_delay: Mutex::new(Duration::ZERO),
            exchange_response: Mutex::new((200, json!({ "playerToken": "player-from-jwt" }))),
            player_info_response: Mutex::new((
                200,
                json!({ "userId": "u-1", "balance": 12.5, "nickname": "Ada" }),
            )),
            last_initiate_body: Mutex::new(None),
            last_poll_query: Mutex::new(None),
            last_refresh_body: Mutex::new(None),
            last_exchange_body: Mutex::new(None),
            last_bearer: Mutex::new(None),
        }
    }
}

impl MockState {
    pub fn script_poll(&self, replies: impl IntoIterator<Item = Reply>) {
        self.poll_script.lock().extend(replies);
    }

    pub fn script_refresh(&self, replies: impl IntoIterator<Item = Reply>) {
        self.refresh_script.lock().extend(replies);
    }

    pub fn calls(&self) -> [u32; 5] {
        [
            self.initiate_calls.load(Ordering::SeqCst),
            self.poll_calls.load(Ordering::SeqCst),
            self.refresh_calls.load(Ordering::SeqCst),
            self.exchange_calls.load(Ordering::SeqCst),
            self.player_info_calls.load(Ordering::SeqCst),
        ]
    }
}

fn reply((status, body): Reply) -> (StatusCode, Json<Value>) {
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(body))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

async fn initiate(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.initiate_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_initiate_body.lock() = Some(body);
    let delay = *state.initiate_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let response = state.initiate_response.lock().clone();
    reply(response)
}

async fn poll(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.poll_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_poll_query.lock() = Some(query);
    let scripted = state.poll_script.lock().pop_front();
    let response = scripted.unwrap_or_else(|| state.poll_default.lock().clone());
    reply(response)
}

async fn refresh(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_refresh_body.lock() = Some(body);
    let delay = *state.refresh_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let scripted = state.refresh_script.lock().pop_front();
    let response = scripted.unwrap_or_else(|| state.refresh_default.lock().clone());
    reply(response)
}

async fn exchange(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.exchange_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_bearer.lock() = bearer(&headers);
    *state.last_exchange_body.lock() = Some(body);
    let response = state.exchange_response.lock().clone();
    reply(response)
}

async fn player_info(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.player_info_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_bearer.lock() = bearer(&headers);
    let response = state.player_info_response.lock().clone();
    reply(response)
}

/// A running mock platform bound to an ephemeral port.
pub struct MockPlatform {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockPlatform {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/device-auth/initiate", post(initiate))
            .route("/api/device-auth/poll", get(poll))
            .route("/api/auth/token/refresh", post(refresh))
            .route("/api/external/exchange-jwt", post(exchange))
            .route("/api/external/player-info", get(player_info))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Headless, memory-backed configuration pointed at this mock.
    pub fn config(&self, game_id: &str) -> SdkConfig {
        let mut config = SdkConfig::new(self.base_url(), game_id);
        config.mode = AuthMode::Headless;
        config.storage = StorageKind::Memory;
        config.http_timeout_secs = 5;
        config
    }

    /// A manager with no UI, no browser and no platform token.
    pub fn manager(&self, config: SdkConfig, backing: &Arc<MemoryStore>) -> Arc<SessionManager> {
        self.manager_with_platform(config, backing, None)
    }

    pub fn manager_with_platform(
        &self,
        config: SdkConfig,
        backing: &Arc<MemoryStore>,
        platform_token: Option<&str>,
    ) -> Arc<SessionManager> {
        SessionManager::builder(config)
            .backing_store(Arc::clone(backing) as Arc<dyn KeyValueStore>)
            .presenter(Arc::new(SilentPresenter))
            .opener(Arc::new(NoopOpener))
            .platform_source(Arc::new(FixedPlatformToken(platform_token.map(str::to_owned))))
            .build()
            .expect("build session manager")
    }
}

/// A credential store over `backing`, sharing its record key.
pub fn store_over(backing: &Arc<MemoryStore>) -> CredentialStore {
    let backing = Arc::clone(backing) as Arc<dyn KeyValueStore>;
    let store = CredentialStore::new(backing, Capabilities::detect());
    store.initialize();
    store
}

/// A player session whose access token expires `access_in_ms` from now
/// (negative means already expired).
pub fn player_session(access_in_ms: i64, refresh_token: Option<&str>) -> Session {
    let now = epoch_ms() as i64;
    Session {
        is_authenticated: true,
        access_token: Some("access-cached".to_owned()),
        token_kind: Some(TokenKind::Player),
        access_token_expires_at: Some((now + access_in_ms) as u64),
        refresh_token: refresh_token.map(str::to_owned),
        refresh_token_expires_at: refresh_token.map(|_| (now + 30 * 24 * 3600 * 1000) as u64),
    }
}

/// Persist `session` for `game_id` in `backing`.
pub fn seed(backing: &Arc<MemoryStore>, game_id: &str, session: &Session) {
    store_over(backing).save(game_id, session).expect("seed session");
}
