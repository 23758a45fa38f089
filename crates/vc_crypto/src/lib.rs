//! vc_crypto — Veilchat cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize secret material on drop.
//! - Public APIs return opaque newtypes to prevent accidental misuse.
//!
//! # Module layout
//! - `aead`  — XChaCha20-Poly1305 seal/open with explicit nonce + AAD
//! - `kdf`   — HKDF-SHA256 per-user key derivation
//! - `hash`  — BLAKE3 utilities (media content hashes)
//! - `error` — unified error type

pub mod aead;
pub mod error;
pub mod hash;
pub mod kdf;

pub use error::CryptoError;
