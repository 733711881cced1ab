//! Salted object checksums.

use sha2::{Digest, Sha256};

/// One element of a checksum stream: an object and its salted checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAndChecksum {
    /// The object id. Streams are ascending by this.
    pub object_id: u64,
    /// Salted checksum of the object's current state.
    pub checksum: u64,
}

impl IdAndChecksum {
    /// Creates a new id/checksum pair.
    #[must_use]
    pub const fn new(object_id: u64, checksum: u64) -> Self {
        Self {
            object_id,
            checksum,
        }
    }
}

/// Computes the salted checksum of an object's state token.
///
/// SHA-256 over `(salt, object id, token)`, truncated to 64 bits. Both legs
/// of a pass must use the same salt for their checksums to be comparable;
/// independent passes use different salts so a colliding mismatch under one
/// salt cannot stay masked forever.
#[must_use]
pub fn salted_checksum(salt: u64, object_id: u64, token: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(salt.to_be_bytes());
    hasher.update(object_id.to_be_bytes());
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}
