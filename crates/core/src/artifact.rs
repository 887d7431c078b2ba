//! Binary artifact storage and the helpers shared by its producers.
//!
//! Keys are content-derived (`{owner}/image_{digest}.png`), so writing the
//! same bytes twice lands on the same object.

use async_trait::async_trait;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::types::DbId;

/// Hex characters of the SHA-256 digest kept in artifact keys.
const KEY_DIGEST_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Invalid base64 payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("Artifact payload is empty")]
    Empty,

    #[error("Artifact storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a stored artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes` under `key`, overwriting any previous object, and
    /// return a stable reference URL.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<StoredArtifact, ArtifactError>;
}

/// Remove a leading `data:<mime>;base64,` prefix, if any.
pub fn strip_data_uri_prefix(encoded: &str) -> &str {
    let trimmed = encoded.trim();
    if trimmed.starts_with("data:") {
        if let Some((_, payload)) = trimmed.split_once(',') {
            return payload;
        }
    }
    trimmed
}

/// Decode a base64 image payload, tolerating a data URI prefix.
pub fn decode_image_base64(encoded: &str) -> Result<Vec<u8>, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(strip_data_uri_prefix(encoded))?;
    if bytes.is_empty() {
        return Err(ArtifactError::Empty);
    }
    Ok(bytes)
}

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Content-derived key for a generated product image.
pub fn image_key(owner: DbId, bytes: &[u8]) -> String {
    let digest = sha256_hex(bytes);
    format!("{owner}/image_{}.png", &digest[..KEY_DIGEST_LEN])
}
