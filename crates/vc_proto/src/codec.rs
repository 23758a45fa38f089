//! Media payload codec — text-safe framing for binary content.
//!
//! Camera stills, voice notes and clips travel the same text-oriented
//! encrypt/decrypt path as chat messages: raw bytes are re-framed as
//! base64 before encryption and decoded back after decryption.
//!
//! This is an encoding, not compression; payloads grow by roughly a
//! third. Anything size-sensitive belongs upstream of this layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid media encoding: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
}

/// Re-frame raw media bytes as text-safe base64 for the cipher path.
pub fn encode_for_encryption(bytes: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Decode base64 media text back to raw bytes after decryption.
pub fn decode_after_decryption(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(base64::Engine::decode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        text,
    )?)
}

/// Hex BLAKE3 digest of the raw media bytes. Computed before encoding;
/// used as a dedup key and upload integrity check.
pub fn media_content_hash(bytes: &[u8]) -> String {
    vc_crypto::hash::content_hash(bytes)
}
