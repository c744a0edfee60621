// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Player info and prepaid balance.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::credential::refresh::error_from_body;
use crate::credential::session::SessionManager;
use crate::error::{AuthError, ErrorCode};

/// The authenticated player as seen by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub user_id: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Fetch player info with a bearer token.
///
/// 401 and 403 mean the credential is no good and map to
/// `credential_invalid`.
pub async fn fetch_player_info(
    client: &reqwest::Client,
    url: &str,
    token: &str,
) -> Result<PlayerInfo, AuthError> {
    let resp = client
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| AuthError::transport(&e))?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| AuthError::transport(&e))?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(error_from_body(ErrorCode::CredentialInvalid, status, &body));
    }
    if !status.is_success() {
        return Err(error_from_body(ErrorCode::PlayerInfoFailed, status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        AuthError::new(ErrorCode::PlayerInfoFailed, format!("parse player info: {e}"))
            .with_status(status.as_u16())
    })
}

/// Player-facing calls that ride on a [`SessionManager`].
pub struct PlayerClient {
    manager: Arc<SessionManager>,
    balance: Mutex<Option<f64>>,
}

impl PlayerClient {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager, balance: Mutex::new(None) }
    }

    /// Fetch the current player, refreshing the token first if needed.
    pub async fn player_info(&self) -> Result<PlayerInfo, AuthError> {
        let threshold = self.manager.config().refresh_threshold();
        self.manager.ensure_valid_token(threshold).await?;
        let token = self.manager.access_token().await?;

        let config = self.manager.config();
        let url = config.url(&config.endpoints.player_info);
        let info = fetch_player_info(self.manager.http_client(), &url, &token).await?;

        *self.balance.lock() = Some(info.balance);
        debug!(balance = info.balance, "player info updated");
        Ok(info)
    }

    /// Last balance seen, if any.
    pub fn balance(&self) -> Option<f64> {
        *self.balance.lock()
    }

    /// Best-effort balance update; failures are logged and the last known
    /// balance is kept.
    pub async fn refresh_balance(&self) -> Option<f64> {
        if let Err(e) = self.player_info().await {
            warn!(code = %e.code, "balance refresh failed: {}", e.message);
        }
        self.balance()
    }
}
