//! BLAKE3-based hash utilities
//!
//! Content-addressing for media payloads (dedup key / upload integrity).

pub fn hash(data: &[u8]) -> [u8; 32] {
    blake3::hash(data).into()
}

/// Hex content hash of raw (unencoded, unencrypted) media bytes.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}
