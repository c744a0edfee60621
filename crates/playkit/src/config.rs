// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Whether the host can show login UI to a human.
///
/// - `Interactive`: present the authorization URL and start the device flow
///   automatically when no credential is available.
/// - `Headless`: never present anything; failing to authenticate at startup
///   is an immediate error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Interactive,
    Headless,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactive => f.write_str("interactive"),
            Self::Headless => f.write_str("headless"),
        }
    }
}

/// Backing store for persisted sessions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Memory,
}

/// Remote endpoint paths, relative to [`SdkConfig::base_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub device_initiate: String,
    pub device_poll: String,
    pub token_refresh: String,
    pub jwt_exchange: String,
    pub player_info: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            device_initiate: "/api/device-auth/initiate".to_owned(),
            device_poll: "/api/device-auth/poll".to_owned(),
            token_refresh: "/api/auth/token/refresh".to_owned(),
            jwt_exchange: "/api/external/exchange-jwt".to_owned(),
            player_info: "/api/external/player-info".to_owned(),
        }
    }
}

/// Configuration for a session manager instance.
#[derive(Debug, Clone, clap::Args)]
pub struct SdkConfig {
    /// Base URL of the platform API.
    #[arg(long, default_value = "https://playkit.ai", env = "PLAYKIT_BASE_URL")]
    pub base_url: String,

    /// Game identifier issued by the platform.
    #[arg(long, env = "PLAYKIT_GAME_ID")]
    pub game_id: String,

    /// Host mode: interactive hosts may show login UI, headless hosts fail fast.
    #[arg(long, value_enum, default_value_t = AuthMode::Interactive, env = "PLAYKIT_MODE")]
    pub mode: AuthMode,

    /// Developer token for pre-production testing (never refreshed).
    #[arg(long, env = "PLAYKIT_DEVELOPER_TOKEN", hide_env_values = true)]
    pub developer_token: Option<String>,

    /// Player token managed by the host (used as-is, no expiry tracking).
    #[arg(long, env = "PLAYKIT_PLAYER_TOKEN", hide_env_values = true)]
    pub player_token: Option<String>,

    /// One-shot JWT to exchange for a player token at startup.
    #[arg(long, env = "PLAYKIT_JWT", hide_env_values = true)]
    pub jwt: Option<String>,

    /// Scope requested by the device authorization flow.
    #[arg(long, default_value = "player:play", env = "PLAYKIT_SCOPE")]
    pub scope: String,

    /// Where sessions are persisted.
    #[arg(long, value_enum, default_value_t = StorageKind::File, env = "PLAYKIT_STORAGE")]
    pub storage: StorageKind,

    /// Directory for the file-backed credential store.
    #[arg(long, env = "PLAYKIT_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Refresh access tokens this many seconds before they expire.
    #[arg(long, default_value_t = 300, env = "PLAYKIT_REFRESH_THRESHOLD_SECS")]
    pub refresh_threshold_secs: u64,

    /// Timeout for each request to the platform API.
    #[arg(long, default_value_t = 30, env = "PLAYKIT_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: u64,

    /// Refuse to persist sessions when encryption is unavailable.
    #[arg(long, env = "PLAYKIT_REQUIRE_ENCRYPTION")]
    pub require_encryption: bool,

    /// Check a cached session against the player-info endpoint at startup.
    #[arg(long, env = "PLAYKIT_VALIDATE_ON_STARTUP")]
    pub validate_on_startup: bool,

    #[arg(skip)]
    pub endpoints: Endpoints,
}

impl SdkConfig {
    /// Default configuration for a game, suitable for embedding code.
    pub fn new(base_url: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            game_id: game_id.into(),
            mode: AuthMode::Interactive,
            developer_token: None,
            player_token: None,
            jwt: None,
            scope: "player:play".to_owned(),
            storage: StorageKind::File,
            state_dir: None,
            refresh_threshold_secs: 300,
            http_timeout_secs: 30,
            require_encryption: false,
            validate_on_startup: false,
            endpoints: Endpoints::default(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.game_id.trim().is_empty() {
            anyhow::bail!("game id must not be empty");
        }
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base url must not be empty");
        }
        Ok(())
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Join an endpoint path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Resolve the state directory for the file-backed store.
    ///
    /// Checks the explicit setting, then `PLAYKIT_STATE_DIR`, then
    /// `$XDG_STATE_HOME/playkit`, then `$HOME/.local/state/playkit`.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var("PLAYKIT_STATE_DIR") {
            return PathBuf::from(dir);
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("playkit");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/playkit");
        }
        PathBuf::from(".playkit")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
