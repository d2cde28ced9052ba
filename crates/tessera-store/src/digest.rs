// crates/tessera-store/src/digest.rs
//
// Deterministic digest over every key-value pair in a store. Two nodes that
// processed the same blocks must produce the same digest.

use sha2::{Digest, Sha256};

use tessera_core::error::TesseraError;
use tessera_core::traits::KvStore;

/// SHA-256 over all entries in ascending key order.
///
/// Each key and value is prefixed with its length as a big-endian u64 so
/// that adjacent entries cannot be re-split into a colliding sequence.
pub fn state_digest<S: KvStore + ?Sized>(store: &S) -> Result<[u8; 32], TesseraError> {
    let mut hasher = Sha256::new();
    for (key, value) in store.prefix_scan(b"")? {
        hasher.update((key.len() as u64).to_be_bytes());
        hasher.update(&key);
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(&value);
    }
    Ok(hasher.finalize().into())
}

/// Hex form of [`state_digest`], used in logs.
pub fn state_digest_hex<S: KvStore + ?Sized>(store: &S) -> Result<String, TesseraError> {
    Ok(hex::encode(state_digest(store)?))
}
