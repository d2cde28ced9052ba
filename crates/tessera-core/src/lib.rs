// crates/tessera-core/src/lib.rs
//
// tessera-core: Core types, traits, and numeric primitives for the Tessera
// treasury engine.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the fixed-point decimal, coin and account types, the error
// taxonomy, and the trait interfaces to the chain's other modules.

pub mod account;
pub mod coin;
pub mod dec;
pub mod error;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use tessera_core::Dec;`

pub use account::AccountId;
pub use coin::{validate_denom, Amount, Coin, Coins, MICRO_UNIT, NATIVE_DENOM, REFERENCE_DENOM};
pub use dec::{Dec, DEC_PRECISION};
pub use error::TesseraError;
pub use traits::{Bank, BatchOp, ExchangeRateOracle, IssuanceLedger, KvStore};
