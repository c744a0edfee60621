// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token refresh and JWT exchange requests.

use reqwest::StatusCode;
use tracing::debug;

use crate::credential::oauth::{
    ErrorResponse, ExchangeRequest, ExchangeResponse, GrantFields, RefreshRequest,
};
use crate::credential::TokenResult;
use crate::error::{AuthError, ErrorCode};

/// Build an error from a non-2xx response, keeping the server's error code
/// and description when the body carries them.
pub(crate) fn error_from_body(code: ErrorCode, status: StatusCode, body: &str) -> AuthError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => AuthError::new(code, err.message())
            .with_status(status.as_u16())
            .with_remote_code(err.error),
        Err(_) => {
            let snippet: String = body.chars().take(200).collect();
            AuthError::new(code, format!("HTTP {status}: {snippet}")).with_status(status.as_u16())
        }
    }
}

/// Exchange a refresh token for a new token set.
///
/// A 401 means the refresh token itself is dead (`refresh_token_invalid`);
/// every other failure is `refresh_failed`.
pub async fn request_refresh(
    client: &reqwest::Client,
    url: &str,
    refresh_token: &str,
) -> Result<TokenResult, AuthError> {
    let resp = client
        .post(url)
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .map_err(|e| AuthError::new(ErrorCode::RefreshFailed, format!("HTTP error: {e}")))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AuthError::new(ErrorCode::RefreshFailed, format!("read body: {e}")))?;

    if status == StatusCode::UNAUTHORIZED {
        return Err(error_from_body(ErrorCode::RefreshTokenInvalid, status, &body));
    }
    if !status.is_success() {
        return Err(error_from_body(ErrorCode::RefreshFailed, status, &body));
    }

    let grant: GrantFields = serde_json::from_str(&body).map_err(|e| {
        AuthError::new(ErrorCode::RefreshFailed, format!("parse response: {e}"))
            .with_status(status.as_u16())
    })?;
    let token = grant.into_token().ok_or_else(|| {
        AuthError::new(ErrorCode::RefreshFailed, "refresh response has no access token")
            .with_status(status.as_u16())
    })?;
    debug!(expires_in_secs = token.expires_in_secs, "refresh endpoint granted tokens");
    Ok(token)
}

/// Exchange a host-supplied JWT for a player token.
pub async fn request_exchange(
    client: &reqwest::Client,
    url: &str,
    jwt: &str,
    game_id: &str,
) -> Result<ExchangeResponse, AuthError> {
    let resp = client
        .post(url)
        .bearer_auth(jwt)
        .json(&ExchangeRequest { game_id })
        .send()
        .await
        .map_err(|e| AuthError::new(ErrorCode::ExchangeFailed, format!("HTTP error: {e}")))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AuthError::new(ErrorCode::ExchangeFailed, format!("read body: {e}")))?;

    if !status.is_success() {
        return Err(error_from_body(ErrorCode::ExchangeFailed, status, &body));
    }

    let exchanged: ExchangeResponse = serde_json::from_str(&body).map_err(|e| {
        AuthError::new(ErrorCode::ExchangeFailed, format!("parse response: {e}"))
            .with_status(status.as_u16())
    })?;
    if exchanged.player_token.is_empty() {
        return Err(AuthError::new(ErrorCode::ExchangeFailed, "exchange returned an empty token")
            .with_status(status.as_u16()));
    }
    Ok(exchanged)
}
