// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared HTTP client construction.

use std::sync::Once;
use std::time::Duration;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Build the HTTP client used for every platform request.
pub fn client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    ensure_crypto();
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("playkit/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
