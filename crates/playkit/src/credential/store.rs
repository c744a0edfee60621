// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: one session record per game, optionally encrypted,
//! over an injected key-value backing store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::credential::crypto::{generate_key, Capabilities, RecordCipher, KEY_LEN};
use crate::credential::Session;

/// Namespace shared by every key this store owns.
pub const KEY_PREFIX: &str = "playkit_";
const RECORD_SUFFIX: &str = "_auth";
/// Key under which the per-installation record key is kept.
pub const ENCRYPTION_KEY_RECORD: &str = "playkit_encryption_key";
/// Marker for sealed record values.
const SEALED_PREFIX: &str = "enc:v1:";

/// Minimal string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
    fn keys(&self) -> anyhow::Result<Vec<String>>;
}

/// Process-local store for servers and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

/// Persistent store: a single JSON object file, rewritten atomically.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) the store file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Store file inside a state directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("credentials.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> anyhow::Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write tmp + rename so readers never see a half-written file.
    fn write_map(&self, map: &BTreeMap<String, String>) -> anyhow::Result<()> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(map)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(key.to_owned(), value.to_owned());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.into_keys().collect())
    }
}

/// Persists sessions keyed by game id.
///
/// Reads never fail: an absent, undecryptable or unparseable record is a
/// cache miss.
pub struct CredentialStore {
    backing: Arc<dyn KeyValueStore>,
    capabilities: Capabilities,
    require_encryption: bool,
    cipher: RwLock<Option<RecordCipher>>,
}

impl CredentialStore {
    pub fn new(backing: Arc<dyn KeyValueStore>, capabilities: Capabilities) -> Self {
        Self { backing, capabilities, require_encryption: false, cipher: RwLock::new(None) }
    }

    /// Refuse to write unencrypted records.
    pub fn require_encryption(mut self, required: bool) -> Self {
        self.require_encryption = required;
        self
    }

    /// Storage key for a game's session record.
    pub fn record_key(game_id: &str) -> String {
        format!("{KEY_PREFIX}{game_id}{RECORD_SUFFIX}")
    }

    /// Load or create the record key. Without a secure random source the
    /// store runs unencrypted.
    pub fn initialize(&self) {
        if !self.capabilities.is_secure() {
            warn!("secure random source unavailable, credential records will not be encrypted");
            *self.cipher.write() = None;
            return;
        }

        match self.load_or_create_key() {
            Ok(cipher) => *self.cipher.write() = Some(cipher),
            Err(e) => {
                warn!(err = %e, "failed to set up record encryption, storing unencrypted");
                *self.cipher.write() = None;
            }
        }
    }

    fn load_or_create_key(&self) -> anyhow::Result<RecordCipher> {
        if let Some(encoded) = self.backing.get(ENCRYPTION_KEY_RECORD)? {
            match STANDARD.decode(encoded.trim()) {
                Ok(bytes) if bytes.len() == KEY_LEN => return RecordCipher::new(&bytes),
                _ => warn!("stored encryption key is malformed, generating a new one"),
            }
        }
        let key = generate_key()?;
        let cipher = RecordCipher::new(&key)?;
        if let Err(e) = self.backing.set(ENCRYPTION_KEY_RECORD, &STANDARD.encode(key)) {
            // The key still works for this process; records written now miss next run.
            warn!(err = %e, "failed to persist encryption key");
        }
        Ok(cipher)
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.read().is_some()
    }

    /// Serialize, seal when a key is available, and write the record.
    pub fn save(&self, game_id: &str, session: &Session) -> anyhow::Result<()> {
        let json = serde_json::to_string(session)?;
        let value = {
            let cipher = self.cipher.read();
            match cipher.as_ref() {
                Some(cipher) => format!("{SEALED_PREFIX}{}", cipher.seal(&json)?),
                None if self.require_encryption => {
                    warn!(game_id, "encryption required but unavailable, session not persisted");
                    return Ok(());
                }
                None => json,
            }
        };
        self.backing.set(&Self::record_key(game_id), &value)?;
        debug!(game_id, encrypted = self.is_encrypted(), "session persisted");
        Ok(())
    }

    /// Read a game's session; `None` on absence or any failure.
    pub fn load(&self, game_id: &str) -> Option<Session> {
        let key = Self::record_key(game_id);
        let raw = match self.backing.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(game_id, err = %e, "failed to read credential record");
                return None;
            }
        };

        let json = match raw.strip_prefix(SEALED_PREFIX) {
            Some(sealed) => {
                let cipher = self.cipher.read();
                let Some(cipher) = cipher.as_ref() else {
                    warn!(game_id, "credential record is encrypted but no key is loaded");
                    return None;
                };
                match cipher.open(sealed) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(game_id, err = %e, "failed to decrypt credential record");
                        return None;
                    }
                }
            }
            None => raw,
        };

        match serde_json::from_str::<Session>(&json) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(game_id, err = %e, "failed to parse credential record");
                None
            }
        }
    }

    /// Remove one game's record.
    pub fn clear(&self, game_id: &str) -> anyhow::Result<()> {
        self.backing.remove(&Self::record_key(game_id))
    }

    /// Remove every session record in this namespace. Unrelated keys and the
    /// record key stay.
    pub fn clear_all(&self) -> anyhow::Result<()> {
        for key in self.backing.keys()? {
            if key.starts_with(KEY_PREFIX) && key.ends_with(RECORD_SUFFIX) {
                self.backing.remove(&key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
