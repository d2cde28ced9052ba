// crates/tessera-treasury/src/settlement.rs
//
// Settlement of the claim pool against the treasury's income.
//
// Once per settlement period:
//   1. Zero income: nothing happens, claims carry over.
//   2. Miners first. With excess = issuance - target: if the excess exceeds
//      the income, the whole income is burned and no claim is paid.
//      Otherwise issuance is brought to the target and the rest of the
//      income (plus any shortfall below target) is the claim pool.
//   3. Within each class, weights are normalized to the class share.
//   4. Each claim is paid floor(normalized weight * claim pool).
//   5. The unpaid remainder (dust) becomes the next income pool.
//   6. All claims are deleted.
//
// `plan_settlement` does all arithmetic up front without side effects.
// `Keeper::settle` writes the state changes into the (cached) store and the
// caller applies the bank operations last, so a failure at any step leaves
// nothing half-paid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use tessera_core::account::AccountId;
use tessera_core::coin::{Amount, Coin};
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::{Bank, KvStore};

use crate::claims::{Claim, ClaimClass};
use crate::keeper::Keeper;
use crate::params::PolicyParameters;

/// Name of the treasury module account.
pub const TREASURY_MODULE: &str = "treasury";

/// Account holding the treasury's income.
pub fn treasury_account() -> AccountId {
    AccountId::module(TREASURY_MODULE)
}

/// A single claim payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub class: ClaimClass,
    pub beneficiary: AccountId,
    pub amount: Amount,
}

/// Every number a settlement produces, computed before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Income pool being settled.
    pub income: Amount,
    /// Native issuance before settlement.
    pub issuance: Amount,
    pub target_issuance: Amount,
    /// Income burned toward the issuance target.
    pub miner_reward: Amount,
    /// Amount available to claimants.
    pub claim_pool: Amount,
    /// Payouts in claim key order, including zero payouts.
    pub payouts: Vec<Payout>,
    /// Sum of all payouts.
    pub claimed: Amount,
    /// `claim_pool - claimed`, carried forward as the next income pool.
    pub dust: Amount,
    /// Burned from the treasury account (income it no longer holds).
    pub treasury_burn: Amount,
    /// Minted into the treasury account (dust funded by the shortfall).
    pub treasury_mint: Amount,
}

impl SettlementPlan {
    /// Total paid to claimants of `class`.
    pub fn class_total(&self, class: ClaimClass) -> Amount {
        self.payouts
            .iter()
            .filter(|p| p.class == class)
            .map(|p| p.amount)
            .sum()
    }

    /// Change in native issuance once the bank operations are applied.
    pub fn issuance_delta(&self) -> Result<i128, TesseraError> {
        let to_i128 = |v: Amount| {
            i128::try_from(v).map_err(|_| TesseraError::overflow("issuance delta"))
        };
        let minted = to_i128(self.treasury_mint)?;
        let claimed = to_i128(self.claimed)?;
        let burned = to_i128(self.treasury_burn)?;
        minted
            .checked_add(claimed)
            .and_then(|v| v.checked_sub(burned))
            .ok_or_else(|| TesseraError::overflow("issuance delta"))
    }

    /// Apply the plan's bank operations: adjust the treasury account, then
    /// pay each beneficiary. Zero amounts are skipped.
    pub fn apply<B: Bank + ?Sized>(&self, treasury: &AccountId, bank: &mut B) -> Result<(), TesseraError> {
        if self.treasury_burn > 0 {
            bank.burn(treasury, &Coin::native(self.treasury_burn))?;
        }
        if self.treasury_mint > 0 {
            bank.mint(treasury, &Coin::native(self.treasury_mint))?;
        }
        for payout in self.payouts.iter().filter(|p| p.amount > 0) {
            bank.mint(&payout.beneficiary, &Coin::native(payout.amount))?;
        }
        Ok(())
    }
}

/// Compute a settlement. Returns `None` when there is no income to settle.
///
/// `claims` must be in claim key order.
pub fn plan_settlement(
    income: Amount,
    issuance: Amount,
    params: &PolicyParameters,
    claims: &[Claim],
) -> Result<Option<SettlementPlan>, TesseraError> {
    if income == 0 {
        return Ok(None);
    }
    let target = params.target_issuance;

    // Step 2: reward the miners.
    let (miner_reward, claim_pool) = if issuance > target {
        let excess = issuance - target;
        if excess > income {
            (income, 0)
        } else {
            (excess, income - excess)
        }
    } else {
        let shortfall = target - issuance;
        let pool = income
            .checked_add(shortfall)
            .ok_or_else(|| TesseraError::overflow("claim pool"))?;
        (0, pool)
    };

    // Step 3: per-class weight sums.
    let mut sums: BTreeMap<ClaimClass, Dec> = BTreeMap::new();
    for claim in claims {
        let sum = sums.entry(claim.class).or_insert(Dec::zero());
        *sum = sum.checked_add(claim.weight)?;
    }

    // Step 4: payouts.
    let mut payouts = Vec::with_capacity(claims.len());
    let mut claimed: Amount = 0;
    for claim in claims {
        let sum = sums.get(&claim.class).copied().unwrap_or_default();
        let amount = if sum.is_zero() || claim_pool == 0 {
            0
        } else {
            claim
                .weight
                .checked_quo(sum)?
                .checked_mul(params.claim_share(claim.class))?
                .mul_amount_floor(claim_pool)?
        };
        claimed = claimed
            .checked_add(amount)
            .ok_or_else(|| TesseraError::overflow("claimed total"))?;
        payouts.push(Payout {
            class: claim.class,
            beneficiary: claim.beneficiary,
            amount,
        });
    }

    // Step 5: dust.
    let dust = claim_pool.checked_sub(claimed).ok_or_else(|| {
        TesseraError::InvalidState(format!(
            "payouts {} exceed claim pool {}",
            claimed, claim_pool
        ))
    })?;

    // The treasury account holds `income` and must end holding `dust`.
    let (treasury_burn, treasury_mint) = if dust <= income {
        (income - dust, 0)
    } else {
        (0, dust - income)
    };

    Ok(Some(SettlementPlan {
        income,
        issuance,
        target_issuance: target,
        miner_reward,
        claim_pool,
        payouts,
        claimed,
        dust,
        treasury_burn,
        treasury_mint,
    }))
}

impl<S: KvStore> Keeper<S> {
    /// Settle the claim pool against the income pool given the current
    /// native `issuance`.
    ///
    /// Deletes every claim and stores the dust as the new income pool. The
    /// returned plan's bank operations still have to be applied by the caller.
    pub fn settle(
        &mut self,
        params: &PolicyParameters,
        issuance: Amount,
    ) -> Result<Option<SettlementPlan>, TesseraError> {
        let income = self.income_pool()?;
        let claims = self.claims()?;
        let plan = match plan_settlement(income, issuance, params, &claims)? {
            Some(plan) => plan,
            None => return Ok(None),
        };

        self.clear_claims()?;
        self.set_income_pool(plan.dust)?;

        info!(
            income = plan.income,
            claim_pool = plan.claim_pool,
            miner_reward = plan.miner_reward,
            claimed = plan.claimed,
            dust = plan.dust,
            claims = claims.len(),
            "Settled claims"
        );
        Ok(Some(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimChain;
    use tessera_store::MemStore;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn account(byte: u8) -> AccountId {
        AccountId::new([byte; 20])
    }

    fn params_with_target(target: Amount) -> PolicyParameters {
        PolicyParameters {
            target_issuance: target,
            ..PolicyParameters::default()
        }
    }

    fn claim(class: ClaimClass, byte: u8, weight: &str) -> Claim {
        Claim::new(class, account(byte), dec(weight))
    }

    #[test]
    fn test_zero_income_is_noop() {
        let claims = vec![claim(ClaimClass::Oracle, 1, "1")];
        let plan = plan_settlement(0, 1000, &params_with_target(1000), &claims).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn test_oracle_claims_take_class_share() {
        let claims = vec![
            claim(ClaimClass::Oracle, 1, "10"),
            claim(ClaimClass::Oracle, 2, "90"),
        ];
        let plan = plan_settlement(1000, 1000, &params_with_target(1000), &claims)
            .unwrap()
            .unwrap();
        assert_eq!(plan.claim_pool, 1000);
        assert_eq!(plan.payouts[0].amount, 10);
        assert_eq!(plan.payouts[1].amount, 90);
        // No budget claims: the budget share stays in the pool.
        assert_eq!(plan.dust, 900);
        assert_eq!(plan.claimed + plan.dust, plan.claim_pool);
    }

    #[test]
    fn test_excess_issuance_burned_first() {
        let claims = vec![
            claim(ClaimClass::Budget, 1, "1"),
            claim(ClaimClass::Oracle, 2, "1"),
        ];
        let plan = plan_settlement(1000, 1200, &params_with_target(1000), &claims)
            .unwrap()
            .unwrap();
        assert_eq!(plan.miner_reward, 200);
        assert_eq!(plan.claim_pool, 800);
        assert_eq!(plan.class_total(ClaimClass::Budget), 720);
        assert_eq!(plan.class_total(ClaimClass::Oracle), 80);
        assert_eq!(plan.dust, 0);
        assert_eq!(plan.treasury_burn, 1000);
        assert_eq!(plan.issuance_delta().unwrap(), -200);
    }

    #[test]
    fn test_excess_above_income_burns_everything() {
        let claims = vec![claim(ClaimClass::Budget, 1, "1")];
        let plan = plan_settlement(100, 5000, &params_with_target(1000), &claims)
            .unwrap()
            .unwrap();
        assert_eq!(plan.miner_reward, 100);
        assert_eq!(plan.claim_pool, 0);
        assert_eq!(plan.payouts[0].amount, 0);
        assert_eq!(plan.dust, 0);
        assert_eq!(plan.treasury_burn, 100);
        assert_eq!(plan.issuance_delta().unwrap(), -100);
    }

    #[test]
    fn test_shortfall_is_minted_into_claim_pool() {
        let claims = vec![claim(ClaimClass::Budget, 1, "1")];
        let plan = plan_settlement(100, 900, &params_with_target(1000), &claims)
            .unwrap()
            .unwrap();
        assert_eq!(plan.claim_pool, 200);
        assert_eq!(plan.payouts[0].amount, 180);
        assert_eq!(plan.dust, 20);
        assert_eq!(plan.treasury_burn, 80);
        assert_eq!(plan.issuance_delta().unwrap(), 100);
    }

    #[test]
    fn test_claim_pool_larger_than_dec_range() {
        let claims = vec![
            claim(ClaimClass::Budget, 1, "1"),
            claim(ClaimClass::Oracle, 2, "1"),
        ];
        let income = 1_000_000_000_000_000_000_000_000u128;
        assert!(income > Dec::MAX_AMOUNT);
        let plan = plan_settlement(income, 10, &params_with_target(10), &claims)
            .unwrap()
            .unwrap();
        assert_eq!(plan.claim_pool, income);
        assert_eq!(plan.class_total(ClaimClass::Budget), income / 10 * 9);
        assert_eq!(plan.class_total(ClaimClass::Oracle), income / 10);
        assert_eq!(plan.dust, 0);
    }

    #[test]
    fn test_floor_rounding_leaves_dust() {
        let claims = vec![
            claim(ClaimClass::Budget, 1, "1"),
            claim(ClaimClass::Budget, 2, "1"),
            claim(ClaimClass::Budget, 3, "1"),
        ];
        let params = PolicyParameters {
            oracle_claim_share: dec("0"),
            budget_claim_share: dec("1"),
            ..params_with_target(1000)
        };
        let plan = plan_settlement(100, 1000, &params, &claims).unwrap().unwrap();
        for payout in &plan.payouts {
            assert_eq!(payout.amount, 33);
        }
        assert_eq!(plan.claimed, 99);
        assert_eq!(plan.dust, 1);
    }

    #[test]
    fn test_zero_weight_class_is_skipped() {
        let claims = vec![
            claim(ClaimClass::Budget, 1, "0"),
            claim(ClaimClass::Oracle, 2, "5"),
        ];
        let plan = plan_settlement(1000, 1000, &params_with_target(1000), &claims)
            .unwrap()
            .unwrap();
        assert_eq!(plan.class_total(ClaimClass::Budget), 0);
        assert_eq!(plan.class_total(ClaimClass::Oracle), 100);
        assert_eq!(plan.dust, 900);
    }

    #[test]
    fn test_keeper_settle_clears_claims_and_keeps_dust() {
        let mut keeper = Keeper::new(MemStore::new());
        let params = params_with_target(1000);
        keeper.add_claim(ClaimClass::Oracle, &account(1), dec("1")).unwrap();
        keeper.set_income_pool(1000).unwrap();
        let plan = keeper.settle(&params, 1000).unwrap().unwrap();
        assert_eq!(plan.claimed, 100);
        assert!(keeper.claims().unwrap().is_empty());
        assert_eq!(keeper.income_pool().unwrap(), 900);
    }

    #[test]
    fn test_keeper_settle_zero_income_keeps_claims() {
        let mut keeper = Keeper::new(MemStore::new());
        keeper.add_claim(ClaimClass::Oracle, &account(1), dec("1")).unwrap();
        assert!(keeper.settle(&params_with_target(1000), 1000).unwrap().is_none());
        assert_eq!(keeper.claims().unwrap().len(), 1);
    }

    #[test]
    fn test_apply_moves_issuance_to_target() {
        let mut chain = SimChain::new();
        let treasury = treasury_account();
        chain.mint(&account(9), &Coin::native(200)).unwrap();
        chain.mint(&treasury, &Coin::native(1000)).unwrap();
        // Supply 1200, target 1000, income 1000.
        let claims = vec![
            claim(ClaimClass::Budget, 1, "3"),
            claim(ClaimClass::Oracle, 2, "1"),
        ];
        let plan = plan_settlement(1000, 1200, &params_with_target(1000), &claims)
            .unwrap()
            .unwrap();
        plan.apply(&treasury, &mut chain).unwrap();
        assert_eq!(chain.supply("utes"), 1000);
        assert_eq!(chain.balance(&treasury, "utes"), plan.dust);
        assert_eq!(chain.balance(&account(1), "utes"), 720);
        assert_eq!(chain.balance(&account(2), "utes"), 80);
    }

    #[test]
    fn test_treasury_mint_when_dust_exceeds_income() {
        // No claims at all while below target: the whole shortfall becomes dust.
        let plan = plan_settlement(10, 500, &params_with_target(1000), &[])
            .unwrap()
            .unwrap();
        assert_eq!(plan.claim_pool, 510);
        assert_eq!(plan.dust, 510);
        assert_eq!(plan.treasury_mint, 500);
        assert_eq!(plan.treasury_burn, 0);
        assert_eq!(plan.issuance_delta().unwrap(), 500);
    }
}
