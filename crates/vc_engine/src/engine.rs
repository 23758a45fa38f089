//! Encrypt/decrypt pipeline: plaintext <-> `EncryptedEnvelope`.
//!
//! [`CipherEngine`] is a stateless transformer over a key and an envelope.
//! [`MessageCipher`] adds key resolution through the keystore and is the
//! type the chat and media services hold.
//!
//! Decryption failures are tagged (`DecryptError`), not swallowed; the
//! sentinel placeholder exists only at the `decrypt_or_placeholder`
//! boundary so message rendering stays non-fatal.

use tracing::warn;

use vc_crypto::aead;
use vc_crypto::kdf::UserKey;
use vc_proto::codec;
use vc_proto::envelope::{EncryptedEnvelope, PayloadKind, ENVELOPE_VERSION};
use vc_store::{ActiveKey, KeyStore, StoreError};

use crate::error::{DecryptError, EngineError};

/// Rendered in place of a message body when decryption fails.
pub const PLACEHOLDER_TEXT: &str = "[encrypted message - cannot be decrypted]";

fn b64_encode(bytes: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

fn b64_decode(field: &str, encoded: &str) -> Result<Vec<u8>, DecryptError> {
    base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, encoded)
        .map_err(|e| DecryptError::Malformed(format!("{field}: {e}")))
}

/// Stateless envelope cipher. All state lives in the key and the envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct CipherEngine;

impl CipherEngine {
    pub fn new() -> Self {
        Self
    }

    /// Encrypt `plaintext` under `key`, producing a self-contained
    /// envelope. A fresh nonce is drawn per call, so encrypting the same
    /// plaintext twice yields different `iv` and `content`.
    pub fn encrypt(
        &self,
        plaintext: &str,
        key: &UserKey,
        key_version: u32,
        kind: PayloadKind,
    ) -> Result<EncryptedEnvelope, EngineError> {
        self.encrypt_at(
            plaintext,
            key,
            key_version,
            kind,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// As `encrypt`, with the timestamp supplied by the caller.
    fn encrypt_at(
        &self,
        plaintext: &str,
        key: &UserKey,
        key_version: u32,
        kind: PayloadKind,
        timestamp: i64,
    ) -> Result<EncryptedEnvelope, EngineError> {
        let nonce = aead::generate_nonce();
        let aad =
            EncryptedEnvelope::associated_data(kind, timestamp, ENVELOPE_VERSION, key_version);
        let ciphertext = aead::seal(key.as_bytes(), &nonce, plaintext.as_bytes(), &aad)?;

        Ok(EncryptedEnvelope {
            content: b64_encode(&ciphertext),
            iv: b64_encode(&nonce),
            timestamp,
            kind,
            version: ENVELOPE_VERSION,
            key_version,
        })
    }

    /// Decrypt an envelope with the exact key that sealed it. The
    /// envelope's kind, timestamp and versions are authenticated along
    /// with the ciphertext; any mismatch fails as `Authentication`.
    pub fn decrypt(
        &self,
        envelope: &EncryptedEnvelope,
        key: &UserKey,
    ) -> Result<String, DecryptError> {
        let ciphertext = b64_decode("content", &envelope.content)?;
        let iv = b64_decode("iv", &envelope.iv)?;
        let nonce: [u8; aead::NONCE_SIZE] = iv
            .as_slice()
            .try_into()
            .map_err(|_| DecryptError::Malformed(format!("iv length {}", iv.len())))?;

        let plaintext = aead::open(key.as_bytes(), &nonce, &ciphertext, &envelope.aad())
            .map_err(|_| DecryptError::Authentication)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| DecryptError::Utf8)
    }

    /// UI-facing variant: any failure renders as [`PLACEHOLDER_TEXT`].
    pub fn decrypt_or_placeholder(&self, envelope: &EncryptedEnvelope, key: &UserKey) -> String {
        match self.decrypt(envelope, key) {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, key_version = envelope.key_version, "message failed to decrypt");
                PLACEHOLDER_TEXT.to_string()
            }
        }
    }

    /// Staleness advisory: false when the envelope timestamp is more than
    /// the freshness window in the past. Age only; authenticity is checked
    /// by `decrypt` itself.
    pub fn integrity_check(&self, envelope: &EncryptedEnvelope) -> bool {
        envelope.is_fresh()
    }
}

/// Key-store-backed cipher: resolves the caller's key, then defers to
/// [`CipherEngine`]. One instance serves all users.
#[derive(Clone)]
pub struct MessageCipher {
    keystore: KeyStore,
    engine: CipherEngine,
}

impl MessageCipher {
    pub fn new(keystore: KeyStore) -> Self {
        Self {
            keystore,
            engine: CipherEngine::new(),
        }
    }

    /// Key lifecycle operations (rotate, clear, purge) are reached through
    /// the keystore itself.
    pub fn keystore(&self) -> &KeyStore {
        &self.keystore
    }

    /// Encrypt a chat message for `user_id` under their active key.
    pub async fn encrypt_text(
        &self,
        user_id: &str,
        text: &str,
    ) -> Result<EncryptedEnvelope, EngineError> {
        let ActiveKey { version, key } = self.keystore.get_or_create(user_id).await?;
        self.engine.encrypt(text, &key, version, PayloadKind::Text)
    }

    /// Encrypt raw media bytes: base64-framed, then through the same
    /// cipher path as text. `kind` must be a media kind.
    pub async fn encrypt_media(
        &self,
        user_id: &str,
        bytes: &[u8],
        kind: PayloadKind,
    ) -> Result<EncryptedEnvelope, EngineError> {
        if !kind.is_media() {
            return Err(EngineError::InvalidPayloadKind(kind));
        }
        let ActiveKey { version, key } = self.keystore.get_or_create(user_id).await?;
        let encoded = codec::encode_for_encryption(bytes);
        self.engine.encrypt(&encoded, &key, version, kind)
    }

    async fn resolve_key(
        &self,
        user_id: &str,
        envelope: &EncryptedEnvelope,
    ) -> Result<UserKey, EngineError> {
        match self
            .keystore
            .key_for_version(user_id, envelope.key_version)
            .await
        {
            Ok(key) => Ok(key),
            Err(StoreError::KeyUnavailable { version, .. }) => {
                Err(DecryptError::UnknownKeyVersion(version).into())
            }
            Err(other) => Err(EngineError::Key(other)),
        }
    }

    /// Decrypt a text envelope for `user_id`, selecting key material by
    /// the envelope's keyring version (active or retired).
    pub async fn decrypt(
        &self,
        user_id: &str,
        envelope: &EncryptedEnvelope,
    ) -> Result<String, EngineError> {
        let key = self.resolve_key(user_id, envelope).await?;
        Ok(self.engine.decrypt(envelope, &key)?)
    }

    /// Decrypt a media envelope back to raw bytes.
    pub async fn decrypt_media(
        &self,
        user_id: &str,
        envelope: &EncryptedEnvelope,
    ) -> Result<Vec<u8>, EngineError> {
        if !envelope.kind.is_media() {
            return Err(EngineError::InvalidPayloadKind(envelope.kind));
        }
        let text = self.decrypt(user_id, envelope).await?;
        codec::decode_after_decryption(&text)
            .map_err(|e| EngineError::from(DecryptError::Malformed(e.to_string())))
    }

    /// UI-facing: any failure (missing key, wrong key, tampering, storage
    /// trouble) renders as [`PLACEHOLDER_TEXT`].
    pub async fn decrypt_or_placeholder(
        &self,
        user_id: &str,
        envelope: &EncryptedEnvelope,
    ) -> String {
        match self.decrypt(user_id, envelope).await {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    %err,
                    user_id,
                    key_version = envelope.key_version,
                    "message failed to decrypt"
                );
                PLACEHOLDER_TEXT.to_string()
            }
        }
    }

    /// Staleness advisory for a fetched envelope.
    pub fn integrity_check(&self, envelope: &EncryptedEnvelope) -> bool {
        self.engine.integrity_check(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_crypto::kdf;

    fn key_pair() -> (UserKey, UserKey) {
        let a = kdf::derive_user_key("a", &kdf::generate_entropy(), 1).unwrap();
        let b = kdf::derive_user_key("b", &kdf::generate_entropy(), 2).unwrap();
        (a, b)
    }

    #[test]
    fn tampered_kind_fails_authentication() {
        let (key, _) = key_pair();
        let engine = CipherEngine::new();
        let mut env = engine
            .encrypt("hello", &key, 1, PayloadKind::Text)
            .unwrap();
        env.kind = PayloadKind::Image;
        assert!(matches!(
            engine.decrypt(&env, &key),
            Err(DecryptError::Authentication)
        ));
    }

    #[test]
    fn tampered_timestamp_fails_authentication() {
        let (key, _) = key_pair();
        let engine = CipherEngine::new();
        let mut env = engine
            .encrypt("hello", &key, 1, PayloadKind::Text)
            .unwrap();
        env.timestamp += 1;
        assert!(matches!(
            engine.decrypt(&env, &key),
            Err(DecryptError::Authentication)
        ));
    }

    #[test]
    fn tampered_key_version_fails_authentication() {
        let (key, _) = key_pair();
        let engine = CipherEngine::new();
        let mut env = engine
            .encrypt("hello", &key, 1, PayloadKind::Text)
            .unwrap();
        env.key_version = 2;
        assert!(matches!(
            engine.decrypt(&env, &key),
            Err(DecryptError::Authentication)
        ));
    }

    #[test]
    fn malformed_iv_is_reported_as_malformed() {
        let (key, _) = key_pair();
        let engine = CipherEngine::new();
        let mut env = engine
            .encrypt("hello", &key, 1, PayloadKind::Text)
            .unwrap();
        env.iv = "!!!".into();
        assert!(matches!(
            engine.decrypt(&env, &key),
            Err(DecryptError::Malformed(_))
        ));

        env.iv = b64_encode(&[0u8; 12]); // wrong length, valid base64
        assert!(matches!(
            engine.decrypt(&env, &key),
            Err(DecryptError::Malformed(_))
        ));
    }

    #[test]
    fn wrong_key_yields_placeholder() {
        let (key, other) = key_pair();
        let engine = CipherEngine::new();
        let env = engine
            .encrypt("hello", &key, 1, PayloadKind::Text)
            .unwrap();
        assert_eq!(engine.decrypt_or_placeholder(&env, &other), PLACEHOLDER_TEXT);
        assert_eq!(engine.decrypt_or_placeholder(&env, &key), "hello");
    }

    #[test]
    fn stale_envelope_flagged_by_integrity_check() {
        let (key, _) = key_pair();
        let engine = CipherEngine::new();
        let mut env = engine
            .encrypt("hello", &key, 1, PayloadKind::Text)
            .unwrap();
        assert!(engine.integrity_check(&env));
        env.timestamp -= vc_proto::envelope::FRESHNESS_WINDOW_MS + 1_000;
        assert!(!engine.integrity_check(&env));
    }
}
