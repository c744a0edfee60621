// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `playkit status`

use serde::Serialize;

use crate::credential::session::SessionManager;
use crate::credential::{epoch_ms, Session, TokenKind};

/// Token-free view of a stored session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub game_id: String,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_kind: Option<TokenKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<u64>,
    pub expired: bool,
    pub refreshable: bool,
    pub encrypted: bool,
}

impl StatusReport {
    pub fn new(game_id: &str, stored: Option<&Session>, encrypted: bool) -> Self {
        let now = epoch_ms();
        Self {
            game_id: game_id.to_owned(),
            authenticated: stored.is_some_and(Session::is_valid),
            token_kind: stored.and_then(|s| s.token_kind),
            access_token_expires_at: stored.and_then(|s| s.access_token_expires_at),
            expired: stored.is_some_and(|s| s.is_access_expired(now)),
            refreshable: stored.is_some_and(|s| s.can_refresh(now)),
            encrypted,
        }
    }
}

pub fn run(manager: &SessionManager) -> i32 {
    let stored = manager.stored_session();
    let report =
        StatusReport::new(&manager.config().game_id, stored.as_ref(), manager.is_encrypted());
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}
