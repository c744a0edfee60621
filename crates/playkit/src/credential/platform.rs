// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery of a token placed by a parent application that already
//! authenticated the user.

/// Environment variable a launching host sets with the player token.
pub const PLATFORM_TOKEN_VAR: &str = "PLAYKIT_PLATFORM_TOKEN";

/// Where a platform-injected token may be found.
pub trait PlatformTokenSource: Send + Sync {
    fn discover(&self) -> Option<String>;
}

/// Reads the token from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvPlatformToken {
    var: String,
}

impl EnvPlatformToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvPlatformToken {
    fn default() -> Self {
        Self::new(PLATFORM_TOKEN_VAR)
    }
}

impl PlatformTokenSource for EnvPlatformToken {
    fn discover(&self) -> Option<String> {
        std::env::var(&self.var).ok().map(|t| t.trim().to_owned()).filter(|t| !t.is_empty())
    }
}

/// A fixed answer, for embedding hosts that hand the token over directly.
#[derive(Debug, Clone, Default)]
pub struct FixedPlatformToken(pub Option<String>);

impl PlatformTokenSource for FixedPlatformToken {
    fn discover(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.is_empty())
    }
}
