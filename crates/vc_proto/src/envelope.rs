//! Encrypted message envelope — the unit of ciphertext exchanged with the
//! backend.
//!
//! The backend is a DUMB STORE: it only sees
//!   - content     (opaque ciphertext, base64)
//!   - iv          (per-encryption nonce, base64)
//!   - timestamp   (epoch milliseconds, needed for retention/staleness)
//!   - type        (advisory payload kind for UI prefetch decisions)
//!   - version     (envelope format version)
//!   - key_version (which keyring version can decrypt this)
//!
//! `type`, `timestamp`, `version` and `key_version` are bound to the
//! ciphertext as AEAD associated data: a tampered envelope fails
//! authentication on decrypt instead of being trusted post hoc.
//!
//! `version` and `key_version` default when absent so four-field envelopes
//! written before key versioning still parse.

use serde::{Deserialize, Serialize};

/// Envelope format version. Bump on breaking wire changes.
pub const ENVELOPE_VERSION: u8 = 1;

/// Envelopes older than this are flagged by `is_fresh*` as stale.
pub const FRESHNESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Advisory tag distinguishing text from media envelope contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Text,
    Image,
    Audio,
    Video,
}

impl PayloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadKind::Text => "text",
            PayloadKind::Image => "image",
            PayloadKind::Audio => "audio",
            PayloadKind::Video => "video",
        }
    }

    /// True for kinds whose plaintext is base64-framed media rather than
    /// chat text.
    pub fn is_media(self) -> bool {
        !matches!(self, PayloadKind::Text)
    }
}

/// On-wire envelope — stored by and fetched from the backend as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// XChaCha20-Poly1305 ciphertext (ct || tag), base64-encoded.
    pub content: String,

    /// 24-byte nonce, base64-encoded. Fresh per encryption, never reused.
    pub iv: String,

    /// Epoch milliseconds at encryption time.
    pub timestamp: i64,

    /// Payload kind. Advisory for the UI, but also AEAD-bound.
    #[serde(rename = "type")]
    pub kind: PayloadKind,

    /// Envelope format version.
    #[serde(default = "default_envelope_version")]
    pub version: u8,

    /// Keyring version whose key sealed `content`.
    #[serde(default = "default_key_version")]
    pub key_version: u32,
}

fn default_envelope_version() -> u8 {
    ENVELOPE_VERSION
}

fn default_key_version() -> u32 {
    1
}

impl EncryptedEnvelope {
    /// Canonical associated-data encoding of the tamper-evident fields.
    /// Length-unambiguous: fixed-width integers, domain prefix.
    pub fn associated_data(
        kind: PayloadKind,
        timestamp: i64,
        version: u8,
        key_version: u32,
    ) -> Vec<u8> {
        let mut aad = Vec::with_capacity(32);
        aad.extend_from_slice(b"vc-envelope-v1\x00");
        aad.push(version);
        aad.extend_from_slice(&timestamp.to_le_bytes());
        aad.extend_from_slice(&key_version.to_le_bytes());
        aad.extend_from_slice(kind.as_str().as_bytes());
        aad
    }

    /// Associated data for this envelope's own fields.
    pub fn aad(&self) -> Vec<u8> {
        Self::associated_data(self.kind, self.timestamp, self.version, self.key_version)
    }

    /// Staleness heuristic against a caller-supplied clock: false when the
    /// envelope is more than `FRESHNESS_WINDOW_MS` in the past. Age only;
    /// says nothing about cryptographic integrity.
    pub fn is_fresh_at(&self, now_millis: i64) -> bool {
        now_millis - self.timestamp <= FRESHNESS_WINDOW_MS
    }

    /// Staleness heuristic against the current wall clock.
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(chrono::Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedEnvelope {
        EncryptedEnvelope {
            content: "Y2lwaGVydGV4dA".into(),
            iv: "bm9uY2Vub25jZW5vbmNlbm9uY2U".into(),
            timestamp: 1_754_500_000_000,
            kind: PayloadKind::Text,
            version: ENVELOPE_VERSION,
            key_version: 1,
        }
    }

    #[test]
    fn wire_field_names_match_backend_schema() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();
        for field in ["content", "iv", "timestamp", "type", "version", "key_version"] {
            assert!(obj.contains_key(field), "missing wire field {field}");
        }
        assert_eq!(json["type"], "text");
        assert_eq!(json["timestamp"], 1_754_500_000_000i64);
    }

    #[test]
    fn kind_serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&PayloadKind::Image).unwrap(),
            "\"image\""
        );
        let kind: PayloadKind = serde_json::from_str("\"audio\"").unwrap();
        assert_eq!(kind, PayloadKind::Audio);
    }

    #[test]
    fn legacy_four_field_envelope_parses_with_defaults() {
        let json = r#"{
            "content": "abc",
            "iv": "def",
            "timestamp": 1000,
            "type": "video"
        }"#;
        let env: EncryptedEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.version, ENVELOPE_VERSION);
        assert_eq!(env.key_version, 1);
        assert_eq!(env.kind, PayloadKind::Video);
    }

    #[test]
    fn roundtrips_through_json() {
        let env = sample();
        let json = serde_json::to_string(&env).unwrap();
        let back: EncryptedEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content, env.content);
        assert_eq!(back.iv, env.iv);
        assert_eq!(back.timestamp, env.timestamp);
        assert_eq!(back.kind, env.kind);
        assert_eq!(back.key_version, env.key_version);
    }

    #[test]
    fn freshness_window_boundary() {
        let env = sample();
        let now = env.timestamp + FRESHNESS_WINDOW_MS;
        assert!(env.is_fresh_at(now));
        assert!(!env.is_fresh_at(now + 1));
        // Envelopes from the future are not stale.
        assert!(env.is_fresh_at(env.timestamp - 5_000));
    }

    #[test]
    fn aad_differs_when_any_bound_field_differs() {
        let base = EncryptedEnvelope::associated_data(PayloadKind::Text, 1000, 1, 1);
        assert_ne!(
            base,
            EncryptedEnvelope::associated_data(PayloadKind::Image, 1000, 1, 1)
        );
        assert_ne!(
            base,
            EncryptedEnvelope::associated_data(PayloadKind::Text, 1001, 1, 1)
        );
        assert_ne!(
            base,
            EncryptedEnvelope::associated_data(PayloadKind::Text, 1000, 2, 1)
        );
        assert_ne!(
            base,
            EncryptedEnvelope::associated_data(PayloadKind::Text, 1000, 1, 2)
        );
    }
}
