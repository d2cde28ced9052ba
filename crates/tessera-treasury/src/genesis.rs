// crates/tessera-treasury/src/genesis.rs
//
// Genesis state: validation, initialisation, and export.

use serde::{Deserialize, Serialize};
use tracing::info;

use tessera_core::coin::{validate_denom, Amount, NATIVE_DENOM};
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::KvStore;

use crate::claims::Claim;
use crate::end_blocker::Treasury;
use crate::params::{PolicyParameters, DEFAULT_GENESIS_REWARD_WEIGHT, DEFAULT_GENESIS_TAX_RATE};

/// Everything needed to start (or restart) the treasury.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: PolicyParameters,
    pub tax_rate: Dec,
    pub reward_weight: Dec,
    /// Per-denom tax caps, `(denom, cap)`.
    #[serde(default)]
    pub tax_caps: Vec<(String, Amount)>,
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub income_pool: Amount,
}

impl Default for GenesisState {
    fn default() -> Self {
        default_genesis()
    }
}

/// Default parameters with the default genesis tax rate and reward weight.
pub fn default_genesis() -> GenesisState {
    GenesisState {
        params: PolicyParameters::default(),
        tax_rate: DEFAULT_GENESIS_TAX_RATE,
        reward_weight: DEFAULT_GENESIS_REWARD_WEIGHT,
        tax_caps: Vec::new(),
        claims: Vec::new(),
        income_pool: 0,
    }
}

impl GenesisState {
    /// Check parameters, registers, caps, and claims.
    pub fn validate(&self) -> Result<(), TesseraError> {
        self.params.validate()?;
        if !self.params.tax_policy.contains(self.tax_rate) {
            return Err(TesseraError::InvalidInput(format!(
                "genesis tax rate {} outside [{}, {}]",
                self.tax_rate, self.params.tax_policy.rate_min, self.params.tax_policy.rate_max
            )));
        }
        if !self.params.reward_policy.contains(self.reward_weight) {
            return Err(TesseraError::InvalidInput(format!(
                "genesis reward weight {} outside [{}, {}]",
                self.reward_weight,
                self.params.reward_policy.rate_min,
                self.params.reward_policy.rate_max
            )));
        }
        for (denom, _) in &self.tax_caps {
            validate_denom(denom)?;
            if denom == NATIVE_DENOM {
                return Err(TesseraError::InvalidInput(
                    "the native denom is tax-exempt and takes no cap".to_string(),
                ));
            }
        }
        if let Some(claim) = self.claims.iter().find(|c| c.weight.is_negative()) {
            return Err(TesseraError::InvalidInput(format!(
                "genesis claim for {} has negative weight {}",
                claim.beneficiary, claim.weight
            )));
        }
        Ok(())
    }
}

impl<S: KvStore> Treasury<S> {
    /// Load `genesis` into an empty store.
    ///
    /// # Errors
    /// `InvalidInput` if the genesis state is invalid, `InvalidState` if the
    /// store was already initialised.
    pub fn init_genesis(&mut self, genesis: &GenesisState) -> Result<(), TesseraError> {
        genesis.validate()?;
        self.transact(|keeper| {
            if keeper.has_params()? {
                return Err(TesseraError::InvalidState(
                    "treasury genesis already initialised".to_string(),
                ));
            }
            keeper.set_params(&genesis.params)?;
            keeper.set_tax_rate(0, genesis.tax_rate)?;
            keeper.set_reward_weight(0, genesis.reward_weight)?;
            for (denom, cap) in &genesis.tax_caps {
                keeper.set_tax_cap(denom, *cap)?;
            }
            for claim in &genesis.claims {
                keeper.add_claim(claim.class, &claim.beneficiary, claim.weight)?;
            }
            keeper.set_income_pool(genesis.income_pool)
        })?;
        info!(
            tax_rate = %genesis.tax_rate,
            reward_weight = %genesis.reward_weight,
            claims = genesis.claims.len(),
            income_pool = genesis.income_pool,
            "Treasury genesis initialised"
        );
        Ok(())
    }

    /// Export the current state as a genesis that restarts from the values
    /// in force at the open epoch.
    pub fn export_genesis(&self) -> Result<GenesisState, TesseraError> {
        let keeper = self.view();
        let epoch = self.open_epoch()?;
        Ok(GenesisState {
            params: keeper.params()?,
            tax_rate: keeper.tax_rate(epoch)?,
            reward_weight: keeper.reward_weight(epoch)?,
            tax_caps: keeper.tax_caps()?,
            claims: keeper.claims()?,
            income_pool: keeper.income_pool()?,
        })
    }
}
