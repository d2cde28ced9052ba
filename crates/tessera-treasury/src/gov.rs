// crates/tessera-treasury/src/gov.rs
//
// Governance proposals that change treasury policy outside the adaptive
// update: a direct tax rate, a direct reward weight, or new parameters.
//
// `validate_basic` is the stateless check a proposal must pass to be
// submitted. Applying it re-checks against the stored parameters.

use serde::{Deserialize, Serialize};
use tracing::info;

use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::KvStore;

use crate::end_blocker::Treasury;
use crate::params::PolicyParameters;

fn validate_text(title: &str, description: &str) -> Result<(), TesseraError> {
    if title.trim().is_empty() {
        return Err(TesseraError::InvalidInput("proposal title is empty".to_string()));
    }
    if description.trim().is_empty() {
        return Err(TesseraError::InvalidInput(
            "proposal description is empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_unit_interval(name: &str, value: Dec) -> Result<(), TesseraError> {
    if value.is_negative() || value > Dec::one() {
        return Err(TesseraError::InvalidInput(format!(
            "{} must be within [0, 1]: {}",
            name, value
        )));
    }
    Ok(())
}

/// Set the tax rate directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRateUpdateProposal {
    pub title: String,
    pub description: String,
    pub tax_rate: Dec,
}

impl TaxRateUpdateProposal {
    pub fn validate_basic(&self) -> Result<(), TesseraError> {
        validate_text(&self.title, &self.description)?;
        validate_unit_interval("tax_rate", self.tax_rate)
    }
}

/// Set the reward weight directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardWeightUpdateProposal {
    pub title: String,
    pub description: String,
    pub reward_weight: Dec,
}

impl RewardWeightUpdateProposal {
    pub fn validate_basic(&self) -> Result<(), TesseraError> {
        validate_text(&self.title, &self.description)?;
        validate_unit_interval("reward_weight", self.reward_weight)
    }
}

/// Replace the policy parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsUpdateProposal {
    pub title: String,
    pub description: String,
    pub params: PolicyParameters,
}

impl ParamsUpdateProposal {
    pub fn validate_basic(&self) -> Result<(), TesseraError> {
        validate_text(&self.title, &self.description)?;
        self.params.validate()
    }
}

impl<S: KvStore> Treasury<S> {
    /// Put a passed tax rate proposal into force from the open epoch.
    pub fn apply_tax_rate_update(&mut self, proposal: &TaxRateUpdateProposal) -> Result<(), TesseraError> {
        proposal.validate_basic()?;
        let epoch = self.open_epoch()?;
        self.transact(|keeper| {
            let policy = keeper.params()?.tax_policy;
            if !policy.contains(proposal.tax_rate) {
                return Err(TesseraError::InvalidInput(format!(
                    "tax rate {} outside [{}, {}]",
                    proposal.tax_rate, policy.rate_min, policy.rate_max
                )));
            }
            keeper.set_tax_rate(epoch, proposal.tax_rate)
        })?;
        info!(epoch, tax_rate = %proposal.tax_rate, title = %proposal.title, "Tax rate set by governance");
        Ok(())
    }

    /// Put a passed reward weight proposal into force from the open epoch.
    pub fn apply_reward_weight_update(
        &mut self,
        proposal: &RewardWeightUpdateProposal,
    ) -> Result<(), TesseraError> {
        proposal.validate_basic()?;
        let epoch = self.open_epoch()?;
        self.transact(|keeper| {
            let policy = keeper.params()?.reward_policy;
            if !policy.contains(proposal.reward_weight) {
                return Err(TesseraError::InvalidInput(format!(
                    "reward weight {} outside [{}, {}]",
                    proposal.reward_weight, policy.rate_min, policy.rate_max
                )));
            }
            keeper.set_reward_weight(epoch, proposal.reward_weight)
        })?;
        info!(epoch, reward_weight = %proposal.reward_weight, title = %proposal.title, "Reward weight set by governance");
        Ok(())
    }

    /// Replace the parameters and pull the registers in force into the new
    /// bounds.
    ///
    /// The epoch length and settlement period cannot change after genesis:
    /// every stored epoch index depends on them.
    pub fn apply_params_update(&mut self, proposal: &ParamsUpdateProposal) -> Result<(), TesseraError> {
        proposal.validate_basic()?;
        let epoch = self.open_epoch()?;
        self.transact(|keeper| {
            let current = keeper.params()?;
            let new = &proposal.params;
            if new.blocks_per_epoch != current.blocks_per_epoch
                || new.settlement_period != current.settlement_period
            {
                return Err(TesseraError::InvalidInput(
                    "blocks_per_epoch and settlement_period are fixed at genesis".to_string(),
                ));
            }
            keeper.set_params(new)?;

            let tax_rate = keeper.tax_rate(epoch)?;
            let bounded = new.tax_policy.bound(tax_rate);
            if bounded != tax_rate {
                keeper.set_tax_rate(epoch, bounded)?;
            }
            let reward_weight = keeper.reward_weight(epoch)?;
            let bounded = new.reward_policy.bound(reward_weight);
            if bounded != reward_weight {
                keeper.set_reward_weight(epoch, bounded)?;
            }
            Ok(())
        })?;
        info!(epoch, title = %proposal.title, "Treasury params updated by governance");
        Ok(())
    }
}
