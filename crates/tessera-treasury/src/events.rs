// crates/tessera-treasury/src/events.rs
//
// Events returned by the end blocker. A no-op settlement produces none.

use serde::{Deserialize, Serialize};

use tessera_core::coin::Amount;
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;

use crate::claims::ClaimClass;
use crate::policy::PolicyUpdate;
use crate::settlement::SettlementPlan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreasuryEvent {
    /// Claims were settled against the income pool.
    Settlement {
        height: u64,
        epoch: u64,
        income: Amount,
        claim_pool: Amount,
        miner_reward: Amount,
        oracle_reward: Amount,
        budget_reward: Amount,
        dust: Amount,
        issuance_delta: i128,
    },
    /// New tax rate and reward weight, in force from `epoch`.
    PolicyUpdate {
        height: u64,
        epoch: u64,
        tax_rate: Dec,
        reward_weight: Dec,
    },
}

impl TreasuryEvent {
    pub fn settlement(height: u64, epoch: u64, plan: &SettlementPlan) -> Result<Self, TesseraError> {
        Ok(TreasuryEvent::Settlement {
            height,
            epoch,
            income: plan.income,
            claim_pool: plan.claim_pool,
            miner_reward: plan.miner_reward,
            oracle_reward: plan.class_total(ClaimClass::Oracle),
            budget_reward: plan.class_total(ClaimClass::Budget),
            dust: plan.dust,
            issuance_delta: plan.issuance_delta()?,
        })
    }

    pub fn policy_update(height: u64, update: &PolicyUpdate) -> Self {
        TreasuryEvent::PolicyUpdate {
            height,
            epoch: update.effective_epoch,
            tax_rate: update.tax_rate,
            reward_weight: update.reward_weight,
        }
    }
}
