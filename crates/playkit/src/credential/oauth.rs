// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the platform's auth endpoints.

use serde::{Deserialize, Serialize};

use crate::credential::TokenResult;

/// Body of the device-auth initiate request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest<'a> {
    pub game_id: &'a str,
    pub code_challenge: &'a str,
    pub code_challenge_method: &'static str,
    pub scope: &'a str,
}

/// Response of the device-auth initiate request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    pub session_id: String,
    pub authorization_url: String,
    #[serde(default)]
    pub poll_interval_seconds: Option<u64>,
    #[serde(default = "default_session_ttl")]
    pub expires_in_seconds: u64,
}

fn default_session_ttl() -> u64 {
    600
}

/// Successful (2xx) poll response: pending or authorized.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub status: String,
    #[serde(default)]
    pub poll_interval_seconds: Option<u64>,
    #[serde(flatten)]
    pub grant: GrantFields,
}

/// Token fields shared by the poll (authorized) and refresh responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantFields {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in_seconds: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_expires_in_seconds: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Access-token lifetime assumed when a grant omits one.
const DEFAULT_GRANT_LIFETIME_SECS: u64 = 3600;

impl GrantFields {
    /// Convert into a token result; `None` when no access token is present.
    pub fn into_token(self) -> Option<TokenResult> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        Some(TokenResult {
            access_token,
            token_type: self.token_type,
            expires_in_secs: self.expires_in_seconds.unwrap_or(DEFAULT_GRANT_LIFETIME_SECS),
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            refresh_expires_in_secs: self.refresh_expires_in_seconds,
            scope: self.scope,
        })
    }
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, alias = "error_description")]
    pub error_description: Option<String>,
}

impl ErrorResponse {
    /// Human-readable message: the description when present, else the code.
    pub fn message(&self) -> String {
        self.error_description.clone().unwrap_or_else(|| self.error.clone())
    }
}

/// Body of the token refresh request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body of the JWT exchange request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest<'a> {
    pub game_id: &'a str,
}

/// Response of the JWT exchange request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    #[serde(alias = "token")]
    pub player_token: String,
    #[serde(default)]
    pub expires_in_seconds: Option<u64>,
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
