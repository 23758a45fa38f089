//! Per-user message key lifecycle.
//!
//! One keyring per user, persisted as a JSON document in the key-value
//! store. The active version encrypts new messages; retired versions are
//! kept so history encrypted before a rotation stays readable, until
//! `purge_retired` drops them. `clear` deletes everything a user ever had
//! (logout / account reset) — history becomes permanently undecryptable,
//! which is intentional privacy-by-deletion.
//!
//! Storage failures propagate. Key material is never substituted with a
//! default value.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use vc_crypto::kdf::{self, UserKey};

use crate::error::StoreError;
use crate::kv::KeyValueStore;

const KEYRING_PREFIX: &str = "vc/keyring/";

fn keyring_key(user_id: &str) -> String {
    format!("{KEYRING_PREFIX}{user_id}")
}

/// Persisted keyring document. Exactly one non-retired version at a time.
#[derive(Debug, Serialize, Deserialize)]
struct KeyRing {
    active: u32,
    keys: Vec<KeyRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyRecord {
    version: u32,
    /// Base64 key material.
    material: String,
    /// Epoch milliseconds at derivation time.
    created_at: i64,
    retired: bool,
}

/// Active key handle handed to the cipher layer. The version travels into
/// the envelope so decryption can find the matching material later.
#[derive(Clone)]
pub struct ActiveKey {
    pub version: u32,
    pub key: UserKey,
}

/// User-scoped key storage. Constructed with the storage collaborator
/// injected; clone freely (all state is behind Arc).
#[derive(Clone)]
pub struct KeyStore {
    storage: Arc<dyn KeyValueStore>,
    /// Per-user guards serialising keyring read-modify-write.
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, user_id: &str) -> Result<Option<KeyRing>, StoreError> {
        match self.storage.get(&keyring_key(user_id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user_id: &str, ring: &KeyRing) -> Result<(), StoreError> {
        let json = serde_json::to_string(ring)?;
        self.storage.set(&keyring_key(user_id), &json).await
    }

    /// Return the active key for `user_id`, deriving and persisting one on
    /// first use. Stable across calls until `rotate` or `clear`.
    pub async fn get_or_create(&self, user_id: &str) -> Result<ActiveKey, StoreError> {
        if let Some(ring) = self.load(user_id).await? {
            return active_from_ring(user_id, &ring);
        }

        // First use for this user: take the per-user guard and re-check so
        // two concurrent callers cannot both mint a key.
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        if let Some(ring) = self.load(user_id).await? {
            return active_from_ring(user_id, &ring);
        }

        let record = mint_key(user_id, 1)?;
        let ring = KeyRing {
            active: 1,
            keys: vec![record],
        };
        self.save(user_id, &ring).await?;
        debug!(user_id, version = 1u32, "created user keyring");
        active_from_ring(user_id, &ring)
    }

    /// Key material for a specific keyring version, active or retired.
    /// Used when decrypting envelopes that predate a rotation.
    pub async fn key_for_version(
        &self,
        user_id: &str,
        version: u32,
    ) -> Result<UserKey, StoreError> {
        let unavailable = || StoreError::KeyUnavailable {
            user_id: user_id.to_string(),
            version,
        };
        let ring = self.load(user_id).await?.ok_or_else(unavailable)?;
        let record = ring.keys.iter().find(|k| k.version == version).ok_or_else(|| {
            warn!(user_id, version, "no key material for requested keyring version");
            unavailable()
        })?;
        Ok(UserKey::from_base64(&record.material)?)
    }

    /// Retire the active key and mint the next version. Envelopes sealed
    /// under earlier versions stay decryptable through `key_for_version`
    /// until `purge_retired`.
    pub async fn rotate(&self, user_id: &str) -> Result<ActiveKey, StoreError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut ring = match self.load(user_id).await? {
            Some(ring) => ring,
            None => KeyRing {
                active: 0,
                keys: Vec::new(),
            },
        };

        for key in &mut ring.keys {
            key.retired = true;
        }
        let next = ring.active + 1;
        ring.keys.push(mint_key(user_id, next)?);
        ring.active = next;
        self.save(user_id, &ring).await?;
        debug!(user_id, version = next, "rotated user key");
        active_from_ring(user_id, &ring)
    }

    /// Drop retired key material. Envelopes sealed under purged versions
    /// become permanently undecryptable.
    pub async fn purge_retired(&self, user_id: &str) -> Result<(), StoreError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let Some(mut ring) = self.load(user_id).await? else {
            return Ok(());
        };
        let before = ring.keys.len();
        ring.keys.retain(|k| !k.retired);
        if ring.keys.len() != before {
            self.save(user_id, &ring).await?;
            debug!(
                user_id,
                purged = before - ring.keys.len(),
                "purged retired keys"
            );
        }
        Ok(())
    }

    /// Delete the user's keyring outright (logout / account reset).
    pub async fn clear(&self, user_id: &str) -> Result<(), StoreError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        self.storage.remove(&keyring_key(user_id)).await?;
        debug!(user_id, "cleared user keyring");
        Ok(())
    }
}

fn mint_key(user_id: &str, version: u32) -> Result<KeyRecord, StoreError> {
    let created_at = chrono::Utc::now().timestamp_millis();
    let entropy = kdf::generate_entropy();
    let key = kdf::derive_user_key(user_id, &entropy, created_at)?;
    Ok(KeyRecord {
        version,
        material: key.to_base64(),
        created_at,
        retired: false,
    })
}

fn active_from_ring(user_id: &str, ring: &KeyRing) -> Result<ActiveKey, StoreError> {
    let record = ring
        .keys
        .iter()
        .find(|k| k.version == ring.active && !k.retired)
        .ok_or_else(|| StoreError::KeyUnavailable {
            user_id: user_id.to_string(),
            version: ring.active,
        })?;
    Ok(ActiveKey {
        version: record.version,
        key: UserKey::from_base64(&record.material)?,
    })
}
