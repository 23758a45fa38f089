//! Key derivation
//!
//! `derive_user_key` — HKDF-SHA256, derives the 32-byte per-user message
//! key from fresh OS entropy mixed with the user id and creation time.
//! The entropy alone carries the full key strength; user id and timestamp
//! domain-separate keys minted for different users and devices.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// Application-wide derivation salt. Not secret.
const USER_KEY_SALT: &[u8] = b"veilchat-user-key-salt-v1";
const USER_KEY_INFO: &[u8] = b"vc-user-key-v1";

/// 32-byte per-user message key. Zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct UserKey(pub(crate) [u8; 32]);

impl UserKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base64 form used when persisting key material in the keyring.
    pub fn to_base64(&self) -> String {
        base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = base64::Engine::decode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            encoded,
        )?;
        Self::from_bytes(&bytes)
    }
}

/// Fresh 32 bytes of OS entropy — the dominant input to key derivation.
pub fn generate_entropy() -> [u8; 32] {
    use rand::RngCore;
    let mut entropy = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    entropy
}

/// Derive a user key from entropy + user id + creation time (epoch millis).
///
/// Deterministic for identical inputs; the keystore persists the derived
/// key rather than the inputs, so this runs once per key version.
pub fn derive_user_key(
    user_id: &str,
    entropy: &[u8; 32],
    created_at_millis: i64,
) -> Result<UserKey, CryptoError> {
    let mut ikm = Vec::with_capacity(32 + user_id.len() + 8);
    ikm.extend_from_slice(entropy);
    ikm.extend_from_slice(user_id.as_bytes());
    ikm.extend_from_slice(&created_at_millis.to_le_bytes());

    let hk = Hkdf::<Sha256>::new(Some(USER_KEY_SALT), &ikm);
    let mut okm = [0u8; 32];
    hk.expand(USER_KEY_INFO, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(UserKey(okm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let entropy = [1u8; 32];
        let a = derive_user_key("u1", &entropy, 1_700_000_000_000).unwrap();
        let b = derive_user_key("u1", &entropy, 1_700_000_000_000).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_users_get_different_keys() {
        let entropy = [1u8; 32];
        let a = derive_user_key("u1", &entropy, 0).unwrap();
        let b = derive_user_key("u2", &entropy, 0).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_entropy_gets_different_keys() {
        let a = derive_user_key("u1", &[1u8; 32], 0).unwrap();
        let b = derive_user_key("u1", &[2u8; 32], 0).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn base64_roundtrip() {
        let key = derive_user_key("u1", &generate_entropy(), 42).unwrap();
        let restored = UserKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.as_bytes(), restored.as_bytes());
    }

    #[test]
    fn from_bytes_rejects_short_material() {
        assert!(UserKey::from_bytes(&[0u8; 16]).is_err());
    }
}
