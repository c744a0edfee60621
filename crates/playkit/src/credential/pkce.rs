// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PKCE (RFC 7636) verifier/challenge helpers.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};

use crate::error::{AuthError, ErrorCode};

/// Number of random bytes behind a verifier (43 chars once encoded).
const VERIFIER_BYTES: usize = 32;

/// A verifier and the S256 challenge derived from it.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Result<Self, AuthError> {
        let verifier = generate_code_verifier()?;
        let challenge = compute_code_challenge(&verifier);
        Ok(Self { verifier, challenge })
    }
}

/// Generate a PKCE code verifier from the OS random source.
///
/// There is no fallback: if the OS cannot supply randomness the flow cannot
/// start.
pub fn generate_code_verifier() -> Result<String, AuthError> {
    let mut bytes = [0u8; VERIFIER_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        AuthError::new(ErrorCode::CryptoUnavailable, format!("no secure random source: {e}"))
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compute code_challenge = base64url_nopad(sha256(verifier)).
pub fn compute_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

#[cfg(test)]
#[path = "pkce_tests.rs"]
mod tests;
