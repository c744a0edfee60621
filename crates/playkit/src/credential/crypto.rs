// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record encryption for the credential store.
//!
//! Records are sealed with AES-128-GCM under a per-installation key. The
//! sealed form is `base64(nonce || ciphertext || tag)`. This is obfuscation
//! for data at rest, not a security boundary: the key lives next to the
//! records it protects.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

/// Key length for AES-128.
pub const KEY_LEN: usize = 16;

/// Whether the host can encrypt records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoMode {
    Secure,
    /// No secure random source; records are stored unencrypted.
    Degraded,
}

/// Result of the one-time capability check performed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub mode: CryptoMode,
}

impl Capabilities {
    /// Probe the system random source once.
    pub fn detect() -> Self {
        let mut probe = [0u8; KEY_LEN];
        let mode = match SystemRandom::new().fill(&mut probe) {
            Ok(()) => CryptoMode::Secure,
            Err(_) => CryptoMode::Degraded,
        };
        Self { mode }
    }

    pub fn degraded() -> Self {
        Self { mode: CryptoMode::Degraded }
    }

    pub fn is_secure(&self) -> bool {
        self.mode == CryptoMode::Secure
    }
}

/// Generate a fresh record key.
pub fn generate_key() -> anyhow::Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    SystemRandom::new().fill(&mut key).map_err(|_| anyhow::anyhow!("secure random unavailable"))?;
    Ok(key)
}

/// AES-128-GCM sealer/opener for store records.
pub struct RecordCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl RecordCipher {
    pub fn new(key: &[u8]) -> anyhow::Result<Self> {
        let unbound = UnboundKey::new(&AES_128_GCM, key)
            .map_err(|_| anyhow::anyhow!("invalid record key length {}", key.len()))?;
        Ok(Self { key: LessSafeKey::new(unbound), rng: SystemRandom::new() })
    }

    /// Encrypt a record, returning the base64 sealed form.
    pub fn seal(&self, plaintext: &str) -> anyhow::Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce_bytes).map_err(|_| anyhow::anyhow!("nonce generation failed"))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| anyhow::anyhow!("seal failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt a sealed record. Fails on tampering, truncation, or a wrong key.
    pub fn open(&self, sealed: &str) -> anyhow::Result<String> {
        let data = STANDARD.decode(sealed.trim())?;
        if data.len() < NONCE_LEN + AES_128_GCM.tag_len() {
            anyhow::bail!("sealed record too short ({} bytes)", data.len());
        }
        let (nonce_bytes, body) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| anyhow::anyhow!("invalid nonce"))?;

        let mut in_out = body.to_vec();
        let plain = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| anyhow::anyhow!("record authentication failed"))?;
        Ok(String::from_utf8(plain.to_vec())?)
    }
}

#[cfg(test)]
#[path = "crypto_tests.rs"]
mod tests;
