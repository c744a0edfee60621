// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication lifecycle events.
//!
//! Events are sent on a broadcast channel immediately after the state change
//! they describe, so a subscriber that reads the manager's state on receipt
//! always observes the new state.

use serde::{Deserialize, Serialize};

use crate::credential::TokenKind;
use crate::error::{AuthError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A credential was resolved and is now attached to outgoing calls.
    Authenticated { kind: TokenKind },
    /// No credential is available.
    Unauthenticated,
    /// The access token was renewed via the refresh endpoint.
    TokenRefreshed {
        #[serde(skip_serializing_if = "Option::is_none")]
        expires_at_ms: Option<u64>,
    },
    /// A device authorization flow is waiting for the user.
    FlowStarted { authorization_url: String },
    /// The session was cleared by `logout()`.
    LoggedOut,
    /// A non-fatal or terminal error worth surfacing to the host.
    Error { code: ErrorCode, message: String },
}

impl AuthEvent {
    pub fn from_error(err: &AuthError) -> Self {
        Self::Error { code: err.code, message: err.message.clone() }
    }
}
