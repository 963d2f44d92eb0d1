//! Identifier minting and validation.
//!
//! Record ids are 24 lowercase hex characters, minted from a SHA-256
//! digest over the record name and a nanosecond timestamp. Syntax is
//! checked up front so malformed ids are rejected before any store
//! access.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Length of a record id in hex characters.
pub const ID_LEN: usize = 24;

/// Mint a fresh id for a record with the given name.
pub fn mint_id(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(nanos.to_le_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..ID_LEN / 2])
}

/// Whether `id` is syntactically a valid record id.
pub fn valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
