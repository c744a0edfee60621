// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error codes surfaced by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotInitialized,
    MissingConfig,
    NotAuthenticated,
    AccessDenied,
    ExpiredToken,
    Cancelled,
    FlowFailed,
    RefreshTokenInvalid,
    RefreshFailed,
    NoRefreshToken,
    TokenExpired,
    ExchangeFailed,
    CredentialInvalid,
    Transport,
    CryptoUnavailable,
    PlayerInfoFailed,
}

/// Coarse grouping of flow errors for login UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Denied,
    Expired,
    Failure,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotInitialized => 500,
            Self::MissingConfig => 400,
            Self::NotAuthenticated => 401,
            Self::AccessDenied => 403,
            Self::ExpiredToken => 410,
            Self::Cancelled => 499,
            Self::FlowFailed => 502,
            Self::RefreshTokenInvalid => 401,
            Self::RefreshFailed => 502,
            Self::NoRefreshToken => 401,
            Self::TokenExpired => 401,
            Self::ExchangeFailed => 502,
            Self::CredentialInvalid => 401,
            Self::Transport => 503,
            Self::CryptoUnavailable => 500,
            Self::PlayerInfoFailed => 502,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::MissingConfig => "missing_config",
            Self::NotAuthenticated => "not_authenticated",
            Self::AccessDenied => "access_denied",
            Self::ExpiredToken => "expired_token",
            Self::Cancelled => "cancelled",
            Self::FlowFailed => "flow_failed",
            Self::RefreshTokenInvalid => "refresh_token_invalid",
            Self::RefreshFailed => "refresh_failed",
            Self::NoRefreshToken => "no_refresh_token",
            Self::TokenExpired => "token_expired",
            Self::ExchangeFailed => "exchange_failed",
            Self::CredentialInvalid => "credential_invalid",
            Self::Transport => "transport",
            Self::CryptoUnavailable => "crypto_unavailable",
            Self::PlayerInfoFailed => "player_info_failed",
        }
    }

    /// UI category for a terminal flow error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AccessDenied => ErrorCategory::Denied,
            Self::ExpiredToken | Self::TokenExpired => ErrorCategory::Expired,
            _ => ErrorCategory::Failure,
        }
    }

    /// Usage errors are never worth retrying.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::MissingConfig)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured SDK error: a code, a human-readable message, and the HTTP
/// status / server error code when the failure came from the platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AuthError {
    pub code: ErrorCode,
    pub message: String,
    pub status: Option<u16>,
    /// Server error code, verbatim.
    pub remote_code: Option<String>,
}

impl AuthError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), status: None, remote_code: None }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_remote_code(mut self, remote: impl Into<String>) -> Self {
        self.remote_code = Some(remote.into());
        self
    }

    /// Wrap a transport-level failure (connect, timeout, body decode).
    pub fn transport(err: &reqwest::Error) -> Self {
        let mut e = Self::new(ErrorCode::Transport, err.to_string());
        e.status = err.status().map(|s| s.as_u16());
        e
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
