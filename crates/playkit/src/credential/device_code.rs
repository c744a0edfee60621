// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device authorization flow with PKCE.
//!
//! `initiate` opens a server-side session and returns the URL the user must
//! visit; `poll` waits for the user to finish. The loop sleeps before every
//! request, honors `slow_down`, stops at the session's local deadline even if
//! the server never says `expired_token`, and returns promptly on `cancel()`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SdkConfig;
use crate::credential::oauth::{ErrorResponse, InitiateRequest, InitiateResponse, PollResponse};
use crate::credential::pkce::PkcePair;
use crate::credential::presenter::{FlowPresenter, NoopOpener, SilentPresenter, UrlOpener};
use crate::credential::refresh::error_from_body;
use crate::credential::TokenResult;
use crate::error::{AuthError, ErrorCode};
use crate::events::AuthEvent;

/// Poll interval used when the server suggests none.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Upper bound for the poll interval, including after `slow_down`.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Longest device session honored, whatever the server reports.
pub const MAX_SESSION_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// One server-side authorization attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct DeviceAuthSession {
    pub session_id: String,
    pub authorization_url: String,
    /// PKCE secret; only ever sent to the poll endpoint.
    pub code_verifier: String,
    pub expires_in: Duration,
    pub expires_at: Instant,
    pub poll_interval: Duration,
}

impl DeviceAuthSession {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions { interval: Some(self.poll_interval), deadline: Some(self.expires_at) }
    }
}

/// Lifecycle of the driver's current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Initiated,
    Polling,
    Authorized,
    Denied,
    Expired,
    Cancelled,
    Failed,
}

impl FlowState {
    fn from_outcome(result: &Result<TokenResult, AuthError>) -> Self {
        match result {
            Ok(_) => Self::Authorized,
            Err(e) => match e.code {
                ErrorCode::AccessDenied => Self::Denied,
                ErrorCode::ExpiredToken => Self::Expired,
                ErrorCode::Cancelled => Self::Cancelled,
                _ => Self::Failed,
            },
        }
    }
}

/// Polling parameters. `None` fields fall back to the defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollOptions {
    pub interval: Option<Duration>,
    pub deadline: Option<Instant>,
}

/// Options for a full interactive run.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub scope: String,
    /// Present the URL and open it; headless hosts only poll.
    pub interactive: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self { scope: "player:play".to_owned(), interactive: false }
    }
}

/// Input to the interval schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalSignal {
    /// Server asked us to back off.
    SlowDown,
    /// Server suggested an interval on a pending response.
    Suggested(Duration),
}

/// Compute the next poll interval.
///
/// `slow_down` doubles the current interval; a suggestion replaces it. Both
/// are capped at [`MAX_POLL_INTERVAL`].
pub fn next_interval(current: Duration, signal: IntervalSignal) -> Duration {
    match signal {
        IntervalSignal::SlowDown => current.saturating_mul(2).min(MAX_POLL_INTERVAL),
        IntervalSignal::Suggested(suggested) => suggested.min(MAX_POLL_INTERVAL),
    }
}

fn suggested_interval(seconds: Option<u64>) -> Option<Duration> {
    seconds.filter(|s| *s > 0).map(Duration::from_secs)
}

/// Result of a single poll request.
enum PollOutcome {
    Pending(Option<Duration>),
    SlowDown,
    Authorized(TokenResult),
    Terminal(AuthError),
    /// Network or parse failure; retried after the current interval.
    Transient(String),
}

fn cancelled() -> AuthError {
    AuthError::new(ErrorCode::Cancelled, "device authorization was cancelled")
}

fn deadline_reached() -> AuthError {
    AuthError::new(ErrorCode::ExpiredToken, "device authorization session expired")
}

/// Drives one device authorization attempt at a time.
pub struct DeviceFlow {
    client: reqwest::Client,
    game_id: String,
    initiate_url: String,
    poll_url: String,
    presenter: Arc<dyn FlowPresenter>,
    opener: Arc<dyn UrlOpener>,
    events: Option<broadcast::Sender<AuthEvent>>,
    state: Mutex<FlowState>,
    cancel: Mutex<CancellationToken>,
}

impl DeviceFlow {
    pub fn new(client: reqwest::Client, config: &SdkConfig) -> Self {
        Self {
            client,
            game_id: config.game_id.clone(),
            initiate_url: config.url(&config.endpoints.device_initiate),
            poll_url: config.url(&config.endpoints.device_poll),
            presenter: Arc::new(SilentPresenter),
            opener: Arc::new(NoopOpener),
            events: None,
            state: Mutex::new(FlowState::Idle),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn FlowPresenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Send `FlowStarted` on this channel once the URL is known.
    pub fn with_events(mut self, events: broadcast::Sender<AuthEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> FlowState {
        *self.state.lock()
    }

    fn set_state(&self, state: FlowState) {
        *self.state.lock() = state;
    }

    /// Install a fresh cancellation token for the next attempt.
    ///
    /// A `cancel()` issued after this call and before the attempt settles
    /// rejects it, even if `initiate` has not run yet.
    pub fn arm(&self) {
        *self.cancel.lock() = CancellationToken::new();
    }

    /// Abort the current attempt. Idempotent; call `arm()` to start over.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    /// Open a server-side authorization session.
    ///
    /// Any failure is final for this attempt; initiate is never retried.
    pub async fn initiate(&self, scope: &str) -> Result<DeviceAuthSession, AuthError> {
        let result = self.initiate_inner(scope).await;
        match &result {
            Ok(_) => self.set_state(FlowState::Initiated),
            Err(e) if e.code == ErrorCode::Cancelled => self.set_state(FlowState::Cancelled),
            Err(_) => self.set_state(FlowState::Failed),
        }
        result
    }

    async fn initiate_inner(&self, scope: &str) -> Result<DeviceAuthSession, AuthError> {
        let cancel = self.cancel.lock().clone();
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let pkce = PkcePair::generate()?;
        let request = InitiateRequest {
            game_id: &self.game_id,
            code_challenge: &pkce.challenge,
            code_challenge_method: "S256",
            scope,
        };

        let send = self.client.post(&self.initiate_url).json(&request).send();
        let resp = tokio::select! {
            _ = cancel.cancelled() => return Err(cancelled()),
            resp = send => resp.map_err(|e| AuthError::transport(&e))?,
        };

        let status = resp.status();
        let body = resp.text().await.map_err(|e| AuthError::transport(&e))?;
        if !status.is_success() {
            let err = error_from_body(ErrorCode::FlowFailed, status, &body);
            warn!(
                status = status.as_u16(),
                code = ?err.remote_code,
                "device authorization initiate failed"
            );
            return Err(err);
        }

        let init: InitiateResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::new(ErrorCode::FlowFailed, format!("parse initiate response: {e}"))
                .with_status(status.as_u16())
        })?;

        let poll_interval = suggested_interval(init.poll_interval_seconds)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
            .min(MAX_POLL_INTERVAL);
        let expires_in = Duration::from_secs(init.expires_in_seconds).min(MAX_SESSION_WINDOW);
        debug!(
            session_id = %init.session_id,
            interval_ms = poll_interval.as_millis() as u64,
            expires_in_secs = init.expires_in_seconds,
            "device authorization initiated"
        );

        let now = Instant::now();
        Ok(DeviceAuthSession {
            session_id: init.session_id,
            authorization_url: init.authorization_url,
            code_verifier: pkce.verifier,
            expires_in,
            expires_at: now.checked_add(expires_in).unwrap_or(now),
            poll_interval,
        })
    }

    /// Poll until the session resolves, the deadline passes, or the attempt
    /// is cancelled.
    pub async fn poll(
        &self,
        session_id: &str,
        code_verifier: &str,
        options: PollOptions,
    ) -> Result<TokenResult, AuthError> {
        let cancel = self.cancel.lock().clone();
        let mut interval =
            options.interval.unwrap_or(DEFAULT_POLL_INTERVAL).min(MAX_POLL_INTERVAL);
        self.set_state(FlowState::Polling);

        let mut attempt: u32 = 0;
        let result = loop {
            if cancel.is_cancelled() {
                break Err(cancelled());
            }
            let now = Instant::now();
            let wait = match options.deadline {
                Some(deadline) if now >= deadline => break Err(deadline_reached()),
                Some(deadline) => interval.min(deadline - now),
                None => interval,
            };

            tokio::select! {
                _ = cancel.cancelled() => break Err(cancelled()),
                _ = tokio::time::sleep(wait) => {}
            }
            if options.deadline.is_some_and(|d| Instant::now() >= d) {
                break Err(deadline_reached());
            }

            attempt += 1;
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break Err(cancelled()),
                outcome = self.poll_once(session_id, code_verifier) => outcome,
            };
            match outcome {
                PollOutcome::Pending(suggested) => {
                    if let Some(suggested) = suggested {
                        interval = next_interval(interval, IntervalSignal::Suggested(suggested));
                    }
                }
                PollOutcome::SlowDown => {
                    interval = next_interval(interval, IntervalSignal::SlowDown);
                    debug!(
                        attempt,
                        interval_ms = interval.as_millis() as u64,
                        "slow_down, backing off"
                    );
                }
                PollOutcome::Authorized(token) => break Ok(token),
                PollOutcome::Terminal(err) => break Err(err),
                PollOutcome::Transient(msg) => {
                    debug!(attempt, "device poll error: {msg}");
                }
            }
        };

        self.set_state(FlowState::from_outcome(&result));
        match &result {
            Ok(_) => info!(attempt, "device authorization completed"),
            Err(e) => warn!(attempt, code = %e.code, "device authorization ended: {}", e.message),
        }
        result
    }

    async fn poll_once(&self, session_id: &str, code_verifier: &str) -> PollOutcome {
        let resp = match self
            .client
            .get(&self.poll_url)
            .query(&[("sessionId", session_id), ("codeVerifier", code_verifier)])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return PollOutcome::Transient(format!("HTTP error: {e}")),
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => return PollOutcome::Transient(format!("read body: {e}")),
        };

        if status.is_success() {
            return classify_success(&body);
        }
        classify_error(status, &body)
    }

    /// Initiate, present, then poll to completion.
    pub async fn run_interactive(&self, options: &FlowOptions) -> Result<TokenResult, AuthError> {
        let result = self.run_inner(options).await;
        if options.interactive {
            match &result {
                Ok(_) => self.presenter.show_success(),
                Err(e) => self.presenter.show_failure(e.category(), &e.message),
            }
        }
        result
    }

    async fn run_inner(&self, options: &FlowOptions) -> Result<TokenResult, AuthError> {
        let session = self.initiate(&options.scope).await?;

        if let Some(ref events) = self.events {
            let _ = events.send(AuthEvent::FlowStarted {
                authorization_url: session.authorization_url.clone(),
            });
        }

        if options.interactive {
            self.presenter.show_pending(&session.authorization_url, session.expires_in);
            if let Err(e) = self.opener.open(&session.authorization_url) {
                warn!(err = %e, "failed to open authorization URL");
            }
        }

        self.poll(&session.session_id, &session.code_verifier, session.poll_options()).await
    }
}

fn classify_success(body: &str) -> PollOutcome {
    let resp: PollResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return PollOutcome::Transient(format!("parse poll response: {e}")),
    };
    match resp.status.as_str() {
        "authorized" => match resp.grant.into_token() {
            Some(token) => PollOutcome::Authorized(token),
            None => PollOutcome::Terminal(AuthError::new(
                ErrorCode::FlowFailed,
                "authorized response has no access token",
            )),
        },
        "denied" | "access_denied" => PollOutcome::Terminal(AuthError::new(
            ErrorCode::AccessDenied,
            "authorization was denied",
        )),
        "expired" | "expired_token" => PollOutcome::Terminal(deadline_reached()),
        "pending" => PollOutcome::Pending(suggested_interval(resp.poll_interval_seconds)),
        other => PollOutcome::Transient(format!("unknown poll status {other:?}")),
    }
}

fn classify_error(status: StatusCode, body: &str) -> PollOutcome {
    let Ok(err) = serde_json::from_str::<ErrorResponse>(body) else {
        return PollOutcome::Transient(format!("HTTP {status} without error body"));
    };
    match err.error.as_str() {
        "authorization_pending" => PollOutcome::Pending(None),
        "slow_down" => PollOutcome::SlowDown,
        "access_denied" => PollOutcome::Terminal(
            AuthError::new(ErrorCode::AccessDenied, err.message())
                .with_status(status.as_u16())
                .with_remote_code(err.error),
        ),
        "expired_token" => PollOutcome::Terminal(
            AuthError::new(ErrorCode::ExpiredToken, err.message())
                .with_status(status.as_u16())
                .with_remote_code(err.error),
        ),
        _ => PollOutcome::Terminal(error_from_body(ErrorCode::FlowFailed, status, body)),
    }
}

#[cfg(test)]
#[path = "device_code_tests.rs"]
mod tests;
