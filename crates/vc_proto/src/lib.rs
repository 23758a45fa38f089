//! vc_proto — Envelope wire types and payload codec for Veilchat
//!
//! The envelope is the only artifact the backend ever sees; it is
//! serialised to JSON and versioned so the format can evolve without
//! breaking stored history.
//!
//! # Modules
//! - `envelope` — Encrypted message envelope (what the backend sees)
//! - `codec`    — Text-safe framing for binary media payloads

pub mod codec;
pub mod envelope;

pub use codec::{decode_after_decryption, encode_for_encryption, CodecError};
pub use envelope::{EncryptedEnvelope, PayloadKind};
