//! vc_store — Veilchat persistent key storage
//!
//! # Modules
//! - `kv`       — storage collaborator contract + SQLite and in-memory backends
//! - `keystore` — versioned per-user keyring lifecycle
//! - `error`    — unified error type

pub mod error;
pub mod keystore;
pub mod kv;

pub use error::StoreError;
pub use keystore::{ActiveKey, KeyStore};
pub use kv::{KeyValueStore, MemoryKv, SqliteKv};
