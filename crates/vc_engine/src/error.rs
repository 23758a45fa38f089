use thiserror::Error;

use vc_proto::PayloadKind;

/// Failure while encrypting or resolving key material. Fatal for the
/// operation at hand; callers must never fall back to storing plaintext.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Key store error: {0}")]
    Key(#[from] vc_store::StoreError),

    #[error("Encryption failed: {0}")]
    Crypto(#[from] vc_crypto::CryptoError),

    #[error("Payload kind {0:?} is not valid for this operation")]
    InvalidPayloadKind(PayloadKind),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),
}

/// Why an envelope failed to decrypt. The kinds are distinguishable so
/// callers can log and react; the UI layer may still collapse all of them
/// into a placeholder via `decrypt_or_placeholder`.
#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("Envelope is malformed: {0}")]
    Malformed(String),

    #[error("Authentication failed (wrong key or tampered envelope)")]
    Authentication,

    #[error("Decrypted payload is not valid UTF-8")]
    Utf8,

    #[error("No key material for keyring version {0}")]
    UnknownKeyVersion(u32),
}
