//! vc_engine — Veilchat message and media encryption engine
//!
//! The outward surface of the encryption core: chat-sending/receiving code
//! and the media-capture service hold a [`MessageCipher`] and call it with
//! a user id and plaintext (or an envelope). Everything below — key
//! resolution, AEAD, envelope framing — is internal.
//!
//! # Modules
//! - `engine` — stateless `CipherEngine` + key-store-backed `MessageCipher`
//! - `error`  — encryption and decryption failure taxonomy

pub mod engine;
pub mod error;

pub use engine::{CipherEngine, MessageCipher, PLACEHOLDER_TEXT};
pub use error::{DecryptError, EngineError};
