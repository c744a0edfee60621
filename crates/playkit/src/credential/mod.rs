// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential lifecycle: session record, persistence, device authorization,
//! refresh, and the session manager that ties them together.

pub mod crypto;
pub mod device_code;
pub mod oauth;
pub mod pkce;
pub mod platform;
pub mod presenter;
pub mod refresh;
pub mod session;
pub mod store;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Lifetime assumed for an exchanged player token when the server omits one.
pub const DEFAULT_EXCHANGE_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// Which identity a bearer token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Developer,
    Player,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Player => "player",
        }
    }
}

/// The authoritative credential record.
///
/// Timestamps are epoch milliseconds. A missing access-token expiry means the
/// token is not tracked (developer, host-managed, or platform-injected).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_kind: Option<TokenKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<u64>,
}

impl Session {
    /// A token used as-is with no expiry tracking and no refresh.
    pub fn untracked(token: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            is_authenticated: true,
            access_token: Some(token.into()),
            token_kind: Some(kind),
            ..Self::default()
        }
    }

    /// Build a player session from a token grant received at `now_ms`.
    pub fn from_grant(grant: &TokenResult, now_ms: u64) -> Self {
        Self {
            is_authenticated: true,
            access_token: Some(grant.access_token.clone()),
            token_kind: Some(TokenKind::Player),
            access_token_expires_at: Some(expiry_after(now_ms, grant.expires_in_secs)),
            refresh_token: grant.refresh_token.clone(),
            refresh_token_expires_at: grant
                .refresh_expires_in_secs
                .map(|secs| expiry_after(now_ms, secs)),
        }
    }

    /// The record holds a usable credential.
    pub fn is_valid(&self) -> bool {
        self.is_authenticated && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Untracked tokens never expire from this component's point of view.
    pub fn is_access_expired(&self, now_ms: u64) -> bool {
        self.access_token_expires_at.is_some_and(|at| at <= now_ms)
    }

    /// A refresh token is present and not known to be expired.
    pub fn can_refresh(&self, now_ms: u64) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.refresh_token_expires_at.is_none_or(|at| at > now_ms)
    }
}

/// Tokens granted by the device flow or the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResult {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in_secs: u64,
    pub refresh_token: Option<String>,
    pub refresh_expires_in_secs: Option<u64>,
    pub scope: Option<String>,
}

/// Public authentication status of a session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Uninitialized,
    Authenticating,
    Authenticated,
    Unauthenticated,
}

/// Absolute expiry `lifetime_secs` after `now_ms`, saturating at `u64::MAX`.
pub fn expiry_after(now_ms: u64, lifetime_secs: u64) -> u64 {
    now_ms.saturating_add(lifetime_secs.saturating_mul(1000))
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
