// crates/tessera-treasury/src/keeper.rs
//
// Typed access to treasury state in a `KvStore`.
//
// Key layout (values are JSON):
//   - `params`                       -> PolicyParameters
//   - `tax_rate:{epoch:020}`         -> Dec, in force from that epoch on
//   - `reward_weight:{epoch:020}`    -> Dec, in force from that epoch on
//   - `tax_cap:{denom}`              -> Amount
//   - `tax_proceeds:{epoch:020}`     -> Coins
//   - `seigniorage:{epoch:020}`      -> Amount
//   - `issuance:{epoch:020}`         -> Amount, native issuance snapshot
//   - `claim:{class}:{account_hex}`  -> Claim (see claims.rs)
//   - `income_pool`                  -> Amount
//   - `last_height`                  -> u64
//
// Epochs are zero-padded to 20 digits so lexicographic key order equals
// numeric epoch order.

use serde::de::DeserializeOwned;
use serde::Serialize;

use tessera_core::coin::Amount;
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::KvStore;

use crate::params::PolicyParameters;

pub(crate) const PARAMS_KEY: &str = "params";
pub(crate) const TAX_RATE_PREFIX: &str = "tax_rate:";
pub(crate) const REWARD_WEIGHT_PREFIX: &str = "reward_weight:";
pub(crate) const TAX_CAP_PREFIX: &str = "tax_cap:";
pub(crate) const TAX_PROCEEDS_PREFIX: &str = "tax_proceeds:";
pub(crate) const SEIGNIORAGE_PREFIX: &str = "seigniorage:";
pub(crate) const ISSUANCE_PREFIX: &str = "issuance:";
pub(crate) const CLAIM_PREFIX: &str = "claim:";
pub(crate) const INCOME_POOL_KEY: &str = "income_pool";
pub(crate) const LAST_HEIGHT_KEY: &str = "last_height";

/// `{prefix}{epoch:020}`.
pub(crate) fn epoch_key(prefix: &str, epoch: u64) -> String {
    format!("{}{:020}", prefix, epoch)
}

/// Parse the epoch back out of an `epoch_key`.
fn parse_epoch_key(prefix: &str, key: &[u8]) -> Result<u64, TesseraError> {
    std::str::from_utf8(key)
        .ok()
        .and_then(|k| k.strip_prefix(prefix))
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .ok_or_else(|| {
            TesseraError::Serialization(format!(
                "malformed key under {}: {:?}",
                prefix,
                String::from_utf8_lossy(key)
            ))
        })
}

/// Typed view over a treasury store.
///
/// Wraps any `KvStore`: the committed store for reads, or a `CacheStore`
/// for a state transition that commits only on success.
#[derive(Debug)]
pub struct Keeper<S> {
    store: S,
}

impl<S: KvStore> Keeper<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwrap the underlying store.
    pub fn into_inner(self) -> S {
        self.store
    }

    // -- raw JSON helpers ---------------------------------------------------

    pub(crate) fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, TesseraError> {
        match self.store.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn put_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), TesseraError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.put(key.as_bytes(), &bytes)
    }

    pub(crate) fn delete_key(&mut self, key: &str) -> Result<(), TesseraError> {
        self.store.delete(key.as_bytes())
    }

    /// All JSON values under `prefix`, with their raw keys, in key order.
    pub(crate) fn scan_json<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<(Vec<u8>, T)>, TesseraError> {
        self.store
            .prefix_scan(prefix.as_bytes())?
            .into_iter()
            .map(|(key, bytes)| Ok((key, serde_json::from_slice(&bytes)?)))
            .collect()
    }

    /// Latest value stored at or before `epoch` under an epoch-keyed prefix.
    fn versioned_at(&self, prefix: &str, epoch: u64) -> Result<Option<(u64, Dec)>, TesseraError> {
        // Any key sorting below `{key}\0` is at or before `key`.
        let mut bound = epoch_key(prefix, epoch).into_bytes();
        bound.push(0);
        match self.store.last_before(prefix.as_bytes(), &bound)? {
            Some((key, bytes)) => Ok(Some((
                parse_epoch_key(prefix, &key)?,
                serde_json::from_slice(&bytes)?,
            ))),
            None => Ok(None),
        }
    }

    // -- params -------------------------------------------------------------

    /// The stored policy parameters.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidState` if genesis has not run.
    pub fn params(&self) -> Result<PolicyParameters, TesseraError> {
        self.get_json(PARAMS_KEY)?.ok_or_else(|| {
            TesseraError::InvalidState("treasury params not initialised".to_string())
        })
    }

    pub fn has_params(&self) -> Result<bool, TesseraError> {
        Ok(self.store.get(PARAMS_KEY.as_bytes())?.is_some())
    }

    pub fn set_params(&mut self, params: &PolicyParameters) -> Result<(), TesseraError> {
        self.put_json(PARAMS_KEY, params)
    }

    // -- tax rate / reward weight history ----------------------------------

    /// Tax rate in force at `epoch`.
    ///
    /// # Errors
    /// Returns `TesseraError::NotFound` if no rate has been set at or before `epoch`.
    pub fn tax_rate(&self, epoch: u64) -> Result<Dec, TesseraError> {
        self.versioned_at(TAX_RATE_PREFIX, epoch)?
            .map(|(_, rate)| rate)
            .ok_or_else(|| TesseraError::NotFound(format!("tax rate for epoch {}", epoch)))
    }

    /// Set the tax rate in force from `epoch` on.
    pub fn set_tax_rate(&mut self, epoch: u64, rate: Dec) -> Result<(), TesseraError> {
        self.put_json(&epoch_key(TAX_RATE_PREFIX, epoch), &rate)
    }

    /// Reward weight in force at `epoch`.
    pub fn reward_weight(&self, epoch: u64) -> Result<Dec, TesseraError> {
        self.versioned_at(REWARD_WEIGHT_PREFIX, epoch)?
            .map(|(_, weight)| weight)
            .ok_or_else(|| TesseraError::NotFound(format!("reward weight for epoch {}", epoch)))
    }

    pub fn set_reward_weight(&mut self, epoch: u64, weight: Dec) -> Result<(), TesseraError> {
        self.put_json(&epoch_key(REWARD_WEIGHT_PREFIX, epoch), &weight)
    }

    // -- tax caps -----------------------------------------------------------

    /// Stored cap for `denom`, if any.
    pub fn stored_tax_cap(&self, denom: &str) -> Result<Option<Amount>, TesseraError> {
        self.get_json(&format!("{}{}", TAX_CAP_PREFIX, denom))
    }

    pub fn set_tax_cap(&mut self, denom: &str, cap: Amount) -> Result<(), TesseraError> {
        self.put_json(&format!("{}{}", TAX_CAP_PREFIX, denom), &cap)
    }

    /// Every stored `(denom, cap)` pair in denom order.
    pub fn tax_caps(&self) -> Result<Vec<(String, Amount)>, TesseraError> {
        self.scan_json::<Amount>(TAX_CAP_PREFIX)?
            .into_iter()
            .map(|(key, cap)| {
                let denom = String::from_utf8_lossy(&key[TAX_CAP_PREFIX.len()..]).into_owned();
                Ok((denom, cap))
            })
            .collect()
    }

    // -- issuance snapshots -------------------------------------------------

    /// Native issuance recorded at the end of `epoch`, if the epoch has closed.
    pub fn issuance_snapshot(&self, epoch: u64) -> Result<Option<Amount>, TesseraError> {
        self.get_json(&epoch_key(ISSUANCE_PREFIX, epoch))
    }

    pub fn set_issuance_snapshot(&mut self, epoch: u64, issuance: Amount) -> Result<(), TesseraError> {
        self.put_json(&epoch_key(ISSUANCE_PREFIX, epoch), &issuance)
    }

    // -- income pool --------------------------------------------------------

    /// Accumulated unsettled native income. Zero when never set.
    pub fn income_pool(&self) -> Result<Amount, TesseraError> {
        Ok(self.get_json(INCOME_POOL_KEY)?.unwrap_or(0))
    }

    pub fn set_income_pool(&mut self, amount: Amount) -> Result<(), TesseraError> {
        self.put_json(INCOME_POOL_KEY, &amount)
    }

    /// Add native income already credited to the treasury account.
    pub fn add_income(&mut self, amount: Amount) -> Result<(), TesseraError> {
        if amount == 0 {
            return Ok(());
        }
        let pool = self
            .income_pool()?
            .checked_add(amount)
            .ok_or_else(|| TesseraError::overflow("income pool"))?;
        self.set_income_pool(pool)
    }

    // -- block progress -----------------------------------------------------

    /// Height of the last block the end blocker processed.
    pub fn last_height(&self) -> Result<Option<u64>, TesseraError> {
        self.get_json(LAST_HEIGHT_KEY)
    }

    pub fn set_last_height(&mut self, height: u64) -> Result<(), TesseraError> {
        self.put_json(LAST_HEIGHT_KEY, &height)
    }
}
