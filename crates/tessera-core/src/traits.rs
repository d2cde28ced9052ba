// crates/tessera-core/src/traits.rs
//
// Seams between the treasury engine and the rest of the chain. Each
// collaborator role is a single flat trait; the engine never reaches past
// these methods.

use crate::account::AccountId;
use crate::coin::{Amount, Coin};
use crate::dec::Dec;
use crate::error::TesseraError;

/// Currency conversion at the current oracle exchange rates.
///
/// Implemented by the oracle/market module.
pub trait ExchangeRateOracle {
    /// Convert `amount` of `from_denom` into `to_denom`.
    ///
    /// Returns `TesseraError::Conversion` when no rate is known. Callers in
    /// the indicator path treat that as a zero contribution.
    fn convert(&self, amount: Dec, from_denom: &str, to_denom: &str) -> Result<Dec, TesseraError>;
}

/// Supply of each denomination, queryable by epoch.
///
/// Implemented by the mint/supply module.
pub trait IssuanceLedger {
    /// Total issuance of `denom` at `epoch`. For the current epoch this is
    /// the live supply.
    fn issuance(&self, denom: &str, epoch: u64) -> Result<Amount, TesseraError>;
}

/// Minting and burning of coins.
///
/// Implemented by the bank module.
pub trait Bank {
    /// Create `coin` and credit it to `recipient`.
    fn mint(&mut self, recipient: &AccountId, coin: &Coin) -> Result<(), TesseraError>;

    /// Debit `coin` from `payer` and destroy it.
    fn burn(&mut self, payer: &AccountId, coin: &Coin) -> Result<(), TesseraError>;
}

/// A single write in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Synchronous key-value store backing all treasury state.
///
/// Implemented by tessera-store (in-memory, RocksDB, and write-buffering cache).
pub trait KvStore {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TesseraError>;

    /// Write `value` under `key`, overwriting any previous value.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), TesseraError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), TesseraError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TesseraError>;

    /// The entry with the greatest key that starts with `prefix` and sorts
    /// strictly before `before`.
    ///
    /// The default walks the whole prefix; ordered backends seek instead.
    fn last_before(
        &self,
        prefix: &[u8],
        before: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, TesseraError> {
        Ok(self
            .prefix_scan(prefix)?
            .into_iter()
            .take_while(|(key, _)| key.as_slice() < before)
            .last())
    }

    /// Apply a batch of writes. Backends with native batches apply it atomically.
    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), TesseraError> {
        for op in ops {
            match op {
                BatchOp::Put { key, value } => self.put(&key, &value)?,
                BatchOp::Delete { key } => self.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl<S: KvStore + ?Sized> KvStore for &mut S {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TesseraError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), TesseraError> {
        (**self).put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TesseraError> {
        (**self).delete(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TesseraError> {
        (**self).prefix_scan(prefix)
    }

    fn last_before(
        &self,
        prefix: &[u8],
        before: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, TesseraError> {
        (**self).last_before(prefix, before)
    }

    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), TesseraError> {
        (**self).write_batch(ops)
    }
}
