use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Key unavailable for user {user_id} (keyring version {version})")]
    KeyUnavailable { user_id: String, version: u32 },

    #[error("Crypto error: {0}")]
    Crypto(#[from] vc_crypto::CryptoError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}
