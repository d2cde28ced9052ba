// crates/tessera-store/src/lib.rs
//
// tessera-store: Storage layer for the Tessera treasury.
//
// Provides a RocksDB-backed persistent store, an in-memory BTreeMap store
// for tests and simulations, a write-buffering cache that turns a block's
// writes into one atomic batch, and a SHA-256 digest over the whole keyspace
// for comparing state across nodes.

pub mod cache;
pub mod digest;
pub mod memory;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use cache::CacheStore;
pub use digest::{state_digest, state_digest_hex};
pub use memory::MemStore;
pub use rocks::RocksStore;
