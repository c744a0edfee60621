// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager: owns the authoritative [`Session`], resolves a
//! credential at startup, and keeps it fresh.
//!
//! Startup tries, in order: developer token, host-supplied player token,
//! cached session (refreshing it if needed), one-shot JWT exchange,
//! platform-injected token, and finally the device authorization flow
//! (interactive hosts) or a `not_authenticated` error (headless hosts).
//!
//! Refresh and the device flow are single-flight: concurrent callers share
//! one in-progress attempt through a slot holding a [`Shared`] future, which
//! the attempt clears when it settles.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::config::{AuthMode, SdkConfig, StorageKind};
use crate::credential::crypto::Capabilities;
use crate::credential::device_code::{DeviceFlow, FlowOptions, FlowState};
use crate::credential::platform::{EnvPlatformToken, PlatformTokenSource};
use crate::credential::presenter::{
    FlowPresenter, NoopOpener, SilentPresenter, SystemOpener, TerminalPresenter, UrlOpener,
};
use crate::credential::refresh::{request_exchange, request_refresh};
use crate::credential::store::{CredentialStore, FileStore, KeyValueStore, MemoryStore};
use crate::credential::{
    epoch_ms, expiry_after, AuthStatus, Session, TokenKind, TokenResult,
    DEFAULT_EXCHANGE_LIFETIME_SECS,
};
use crate::error::{AuthError, ErrorCode};
use crate::events::AuthEvent;
use crate::player::fetch_player_info;

type SharedOutcome = Shared<BoxFuture<'static, Result<TokenResult, AuthError>>>;

const EVENT_CAPACITY: usize = 64;

static DEFAULT_INSTANCE: OnceLock<Arc<SessionManager>> = OnceLock::new();

/// Assembles a [`SessionManager`] with injectable collaborators.
pub struct SessionManagerBuilder {
    config: SdkConfig,
    backing: Option<Arc<dyn KeyValueStore>>,
    capabilities: Option<Capabilities>,
    presenter: Option<Arc<dyn FlowPresenter>>,
    opener: Option<Arc<dyn UrlOpener>>,
    platform: Option<Arc<dyn PlatformTokenSource>>,
}

impl SessionManagerBuilder {
    /// Backing key-value store. Defaults to the store named by `config.storage`.
    pub fn backing_store(mut self, backing: Arc<dyn KeyValueStore>) -> Self {
        self.backing = Some(backing);
        self
    }

    /// Override the startup crypto capability check.
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn FlowPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn platform_source(mut self, platform: Arc<dyn PlatformTokenSource>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn build(self) -> Result<Arc<SessionManager>, AuthError> {
        let config = self.config;
        config.validate().map_err(|e| AuthError::new(ErrorCode::MissingConfig, e.to_string()))?;

        let client = crate::http::client(config.http_timeout()).map_err(|e| {
            AuthError::new(ErrorCode::Transport, format!("failed to build HTTP client: {e}"))
        })?;

        let backing: Arc<dyn KeyValueStore> = match self.backing {
            Some(b) => b,
            None => match config.storage {
                StorageKind::Memory => Arc::new(MemoryStore::new()),
                StorageKind::File => Arc::new(FileStore::in_dir(&config.state_dir())),
            },
        };
        let capabilities = self.capabilities.unwrap_or_else(Capabilities::detect);
        let store = CredentialStore::new(backing, capabilities)
            .require_encryption(config.require_encryption);
        store.initialize();

        let interactive = config.mode == AuthMode::Interactive;
        let presenter = self.presenter.unwrap_or_else(|| -> Arc<dyn FlowPresenter> {
            if interactive {
                Arc::new(TerminalPresenter)
            } else {
                Arc::new(SilentPresenter)
            }
        });
        let opener = self.opener.unwrap_or_else(|| -> Arc<dyn UrlOpener> {
            if interactive {
                Arc::new(SystemOpener)
            } else {
                Arc::new(NoopOpener)
            }
        });

        let platform = self.platform.unwrap_or_else(|| -> Arc<dyn PlatformTokenSource> {
            Arc::new(EnvPlatformToken::default())
        });

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let flow = DeviceFlow::new(client.clone(), &config)
            .with_presenter(presenter)
            .with_opener(opener)
            .with_events(events.clone());

        Ok(Arc::new(SessionManager {
            client,
            store,
            flow,
            platform,
            session: RwLock::new(Session::default()),
            status: Mutex::new(AuthStatus::Uninitialized),
            initialized: AtomicBool::new(false),
            events,
            flow_slot: Mutex::new(None),
            refresh_slot: Mutex::new(None),
            config,
        }))
    }
}

/// Single source of truth for the credential attached to outgoing calls.
pub struct SessionManager {
    config: SdkConfig,
    client: reqwest::Client,
    store: CredentialStore,
    flow: DeviceFlow,
    platform: Arc<dyn PlatformTokenSource>,
    session: RwLock<Session>,
    status: Mutex<AuthStatus>,
    initialized: AtomicBool,
    events: broadcast::Sender<AuthEvent>,
    flow_slot: Mutex<Option<SharedOutcome>>,
    refresh_slot: Mutex<Option<SharedOutcome>>,
}

impl SessionManager {
    pub fn builder(config: SdkConfig) -> SessionManagerBuilder {
        SessionManagerBuilder {
            config,
            backing: None,
            capabilities: None,
            presenter: None,
            opener: None,
            platform: None,
        }
    }

    /// Make `manager` the process-wide default. Returns false if one is
    /// already installed.
    pub fn install_default(manager: Arc<Self>) -> bool {
        DEFAULT_INSTANCE.set(manager).is_ok()
    }

    pub fn default_instance() -> Option<Arc<Self>> {
        DEFAULT_INSTANCE.get().cloned()
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> AuthStatus {
        *self.status.lock()
    }

    pub fn flow_state(&self) -> FlowState {
        self.flow.state()
    }

    pub fn is_encrypted(&self) -> bool {
        self.store.is_encrypted()
    }

    /// The persisted record for this game, without touching the network.
    pub fn stored_session(&self) -> Option<Session> {
        self.store.load(&self.config.game_id)
    }

    /// A read-only copy of the current session.
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_valid()
    }

    /// True only for tracked tokens past their expiry.
    pub async fn is_token_expired(&self) -> bool {
        self.session.read().await.is_access_expired(epoch_ms())
    }

    /// The bearer token to attach right now. Does not refresh.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(AuthError::new(
                ErrorCode::NotInitialized,
                "session manager used before initialize()",
            ));
        }
        let session = self.session.read().await;
        match session.access_token {
            Some(ref token) if session.is_valid() => Ok(token.clone()),
            _ => Err(AuthError::new(ErrorCode::NotAuthenticated, "no credential available")),
        }
    }

    fn set_status(&self, status: AuthStatus) {
        *self.status.lock() = status;
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    /// Resolve a credential using the startup priority order.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), AuthError> {
        self.initialized.store(true, Ordering::Release);
        self.set_status(AuthStatus::Authenticating);

        let result = self.resolve().await;
        match result {
            Ok(kind) => {
                info!(game_id = %self.config.game_id, ?kind, "authenticated");
                Ok(())
            }
            Err(e) => {
                if !self.session.read().await.is_valid() {
                    self.set_status(AuthStatus::Unauthenticated);
                }
                self.emit(AuthEvent::from_error(&e));
                Err(e)
            }
        }
    }

    async fn resolve(self: &Arc<Self>) -> Result<TokenKind, AuthError> {
        let game_id = self.config.game_id.as_str();

        if let Some(token) = self.config.developer_token.as_deref().filter(|t| !t.is_empty()) {
            info!(game_id, "using developer token");
            self.adopt(Session::untracked(token, TokenKind::Developer), false).await;
            return Ok(TokenKind::Developer);
        }

        if let Some(token) = self.config.player_token.as_deref().filter(|t| !t.is_empty()) {
            info!(game_id, "using host-supplied player token");
            self.adopt(Session::untracked(token, TokenKind::Player), false).await;
            return Ok(TokenKind::Player);
        }

        if let Some(kind) = self.resume_cached().await {
            self.set_status(AuthStatus::Authenticated);
            self.emit(AuthEvent::Authenticated { kind });
            return Ok(kind);
        }

        if let Some(jwt) = self.config.jwt.as_deref().filter(|t| !t.is_empty()) {
            info!(game_id, "exchanging host JWT for a player token");
            self.exchange_jwt(jwt).await?;
            return Ok(TokenKind::Player);
        }

        if let Some(token) = self.platform.discover() {
            info!(game_id, "using platform-injected token");
            self.adopt(Session::untracked(token, TokenKind::Player), false).await;
            return Ok(TokenKind::Player);
        }

        self.set_status(AuthStatus::Unauthenticated);
        self.emit(AuthEvent::Unauthenticated);

        match self.config.mode {
            AuthMode::Interactive => {
                info!(game_id, "no credential found, starting device authorization");
                self.start_interactive_flow().await?;
                Ok(TokenKind::Player)
            }
            AuthMode::Headless => Err(AuthError::new(
                ErrorCode::NotAuthenticated,
                "not authenticated and headless mode cannot show login UI",
            )),
        }
    }

    /// Steps 3 and 4: a cached session, refreshed if its access token
    /// expired. With `validate_on_startup` the result is checked once against
    /// the player-info endpoint and dropped if the server rejects it.
    async fn resume_cached(self: &Arc<Self>) -> Option<TokenKind> {
        let game_id = self.config.game_id.as_str();
        let cached = self.store.load(game_id)?;
        if !cached.is_valid() {
            return None;
        }
        let kind = cached.token_kind.unwrap_or(TokenKind::Player);
        let now = epoch_ms();

        if !cached.is_access_expired(now) {
            info!(game_id, ?kind, "resuming cached session");
            *self.session.write().await = cached;
        } else if cached.can_refresh(now) {
            info!(game_id, "cached access token expired, refreshing");
            *self.session.write().await = cached;
            if let Err(e) = self.refresh().await {
                warn!(game_id, code = %e.code, "refresh of cached session failed: {}", e.message);
                *self.session.write().await = Session::default();
                return None;
            }
        } else {
            info!(game_id, "cached session expired and cannot be refreshed");
            self.clear_record();
            return None;
        }

        if self.config.validate_on_startup {
            let token = self.session.read().await.access_token.clone().unwrap_or_default();
            if !self.validate_credential(&token).await {
                warn!(game_id, "cached session rejected by the platform, discarding");
                *self.session.write().await = Session::default();
                self.clear_record();
                return None;
            }
        }
        Some(kind)
    }

    /// False only when the platform says the credential is no good.
    async fn validate_credential(&self, token: &str) -> bool {
        let url = self.config.url(&self.config.endpoints.player_info);
        match fetch_player_info(&self.client, &url, token).await {
            Ok(_) => true,
            Err(e) if e.code == ErrorCode::CredentialInvalid => false,
            Err(e) => {
                warn!(code = %e.code, "could not validate cached session, keeping it");
                true
            }
        }
    }

    /// Replace the session, optionally persist it, and announce it.
    async fn adopt(&self, session: Session, persist: bool) {
        let kind = session.token_kind.unwrap_or(TokenKind::Player);
        {
            let mut current = self.session.write().await;
            if persist {
                self.persist(&session);
            }
            *current = session;
        }
        self.set_status(AuthStatus::Authenticated);
        self.emit(AuthEvent::Authenticated { kind });
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(&self.config.game_id, session) {
            warn!(game_id = %self.config.game_id, err = %e, "failed to persist session");
        }
    }

    fn clear_record(&self) {
        if let Err(e) = self.store.clear(&self.config.game_id) {
            warn!(game_id = %self.config.game_id, err = %e, "failed to clear stored session");
        }
    }

    /// Join the attempt in `slot`, or start one with `start`.
    fn join_or_start(
        slot: &Mutex<Option<SharedOutcome>>,
        start: impl FnOnce() -> BoxFuture<'static, Result<TokenResult, AuthError>>,
    ) -> SharedOutcome {
        let mut guard = slot.lock();
        if let Some(ref running) = *guard {
            debug!("joining in-flight attempt");
            return running.clone();
        }
        let attempt = start().shared();
        *guard = Some(attempt.clone());
        attempt
    }

    /// Refresh if the access token expires within `threshold`.
    ///
    /// A no-op for untracked tokens and when unauthenticated. A failed
    /// refresh is swallowed while the token is still valid; once it has
    /// actually expired the call fails with `token_expired`.
    pub async fn ensure_valid_token(
        self: &Arc<Self>,
        threshold: Duration,
    ) -> Result<(), AuthError> {
        let (expires_at, refreshable) = {
            let session = self.session.read().await;
            if !session.is_valid() {
                return Ok(());
            }
            let Some(expires_at) = session.access_token_expires_at else {
                return Ok(());
            };
            let now = epoch_ms();
            if expires_at > now.saturating_add(threshold.as_millis() as u64) {
                return Ok(());
            }
            (expires_at, session.can_refresh(now))
        };

        if !refreshable {
            if expires_at <= epoch_ms() {
                return Err(AuthError::new(
                    ErrorCode::TokenExpired,
                    "access token expired and no refresh token is available",
                ));
            }
            return Ok(());
        }

        match self.refresh().await {
            Ok(_) => Ok(()),
            Err(e) if e.code == ErrorCode::RefreshTokenInvalid => Err(e),
            Err(e) if expires_at <= epoch_ms() => Err(AuthError::new(
                ErrorCode::TokenExpired,
                format!("access token expired and refresh failed: {}", e.message),
            )),
            Err(e) => {
                debug!(code = %e.code, "refresh failed, token still valid");
                Ok(())
            }
        }
    }

    /// Renew the access token with the stored refresh token.
    ///
    /// On 401 the whole session is cleared before the error is returned.
    /// Other failures leave the session untouched.
    pub async fn refresh(self: &Arc<Self>) -> Result<TokenResult, AuthError> {
        let attempt = Self::join_or_start(&self.refresh_slot, || {
            let this = Arc::clone(self);
            async move {
                let result = this.run_refresh().await;
                this.refresh_slot.lock().take();
                result
            }
            .boxed()
        });
        attempt.await
    }

    async fn run_refresh(&self) -> Result<TokenResult, AuthError> {
        let game_id = self.config.game_id.as_str();
        let refresh_token = self
            .session
            .read()
            .await
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::new(ErrorCode::NoRefreshToken, "no refresh token"))?;

        let url = self.config.url(&self.config.endpoints.token_refresh);
        match request_refresh(&self.client, &url, &refresh_token).await {
            Ok(token) => {
                let expires_at_ms = {
                    let mut session = self.session.write().await;
                    if session.refresh_token.as_deref() != Some(refresh_token.as_str()) {
                        return Err(AuthError::new(
                            ErrorCode::RefreshFailed,
                            "session changed while refreshing",
                        ));
                    }
                    let mut next = Session::from_grant(&token, epoch_ms());
                    if next.refresh_token.is_none() {
                        next.refresh_token = session.refresh_token.take();
                        next.refresh_token_expires_at = session.refresh_token_expires_at;
                    }
                    self.persist(&next);
                    *session = next;
                    session.access_token_expires_at
                };
                self.set_status(AuthStatus::Authenticated);
                info!(game_id, expires_in_secs = token.expires_in_secs, "access token refreshed");
                self.emit(AuthEvent::TokenRefreshed { expires_at_ms });
                Ok(token)
            }
            Err(e) if e.code == ErrorCode::RefreshTokenInvalid => {
                warn!(game_id, "refresh token rejected, signing out");
                self.clear_session().await;
                self.emit(AuthEvent::Unauthenticated);
                self.emit(AuthEvent::from_error(&e));
                Err(e)
            }
            Err(e) => {
                warn!(game_id, code = %e.code, status = ?e.status, "refresh failed: {}", e.message);
                self.emit(AuthEvent::from_error(&e));
                Err(e)
            }
        }
    }

    /// Run the device flow with login UI.
    pub fn start_interactive_flow(
        self: &Arc<Self>,
    ) -> impl Future<Output = Result<TokenResult, AuthError>> + Send + 'static {
        self.start_device_flow(FlowOptions { scope: self.config.scope.clone(), interactive: true })
    }

    /// Run the device flow, joining one already in progress.
    ///
    /// The attempt is registered when this is called, not when the returned
    /// future is first polled, so a `cancel_flow()` issued in between still
    /// rejects it. On success the granted tokens replace the session and are
    /// persisted; on failure the session is left as it was.
    pub fn start_device_flow(
        self: &Arc<Self>,
        options: FlowOptions,
    ) -> impl Future<Output = Result<TokenResult, AuthError>> + Send + 'static {
        Self::join_or_start(&self.flow_slot, || {
            self.flow.arm();
            let this = Arc::clone(self);
            async move {
                let result = this.run_flow(options).await;
                this.flow_slot.lock().take();
                result
            }
            .boxed()
        })
    }

    async fn run_flow(&self, options: FlowOptions) -> Result<TokenResult, AuthError> {
        self.set_status(AuthStatus::Authenticating);
        let result = self.flow.run_interactive(&options).await;
        match result {
            Ok(ref token) => {
                self.adopt(Session::from_grant(token, epoch_ms()), true).await;
            }
            Err(ref e) => {
                let status = if self.session.read().await.is_valid() {
                    AuthStatus::Authenticated
                } else {
                    AuthStatus::Unauthenticated
                };
                self.set_status(status);
                self.emit(AuthEvent::from_error(e));
            }
        }
        result
    }

    /// Abort the registered device flow. Every joined caller sees `cancelled`.
    /// A no-op when no flow is registered.
    pub fn cancel_flow(&self) {
        self.flow.cancel();
    }

    /// Exchange a host JWT for a player token and adopt it.
    pub async fn exchange_jwt(&self, jwt: &str) -> Result<String, AuthError> {
        let url = self.config.url(&self.config.endpoints.jwt_exchange);
        let exchanged = request_exchange(&self.client, &url, jwt, &self.config.game_id).await?;
        let lifetime = exchanged.expires_in_seconds.unwrap_or(DEFAULT_EXCHANGE_LIFETIME_SECS);

        let session = Session {
            is_authenticated: true,
            access_token: Some(exchanged.player_token.clone()),
            token_kind: Some(TokenKind::Player),
            access_token_expires_at: Some(expiry_after(epoch_ms(), lifetime)),
            refresh_token: None,
            refresh_token_expires_at: None,
        };
        self.adopt(session, true).await;
        Ok(exchanged.player_token)
    }

    async fn clear_session(&self) {
        {
            let mut session = self.session.write().await;
            *session = Session::default();
            self.clear_record();
        }
        self.set_status(AuthStatus::Unauthenticated);
    }

    /// Forget this game's credential in memory and in the store.
    pub async fn logout(&self) {
        self.clear_session().await;
        info!(game_id = %self.config.game_id, "logged out");
        self.emit(AuthEvent::LoggedOut);
    }
}
