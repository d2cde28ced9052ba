// crates/tessera-treasury/src/policy.rs
//
// Adaptive control of the tax rate and reward weight, plus tax caps.
//
// At every settlement boundary outside probation:
//   tax_rate'      = tax_rate * (TRL_long + mining_increment) / TRL_short
//   reward_weight' = reward_weight * seigniorage_burden_target / SMR_short
// each passed through the two-stage clamp of its PolicyConstraints. A zero
// short-window average skips that update and keeps the old value. The new
// values take effect from the next epoch; the old ones stay in history.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tessera_core::coin::{Amount, NATIVE_DENOM};
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::{ExchangeRateOracle, IssuanceLedger, KvStore};

use crate::indicator::IndicatorEngine;
use crate::keeper::Keeper;
use crate::params::PolicyParameters;

/// Outcome of one policy step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyUpdate {
    /// First epoch the new values are in force.
    pub effective_epoch: u64,
    pub tax_rate: Dec,
    pub reward_weight: Dec,
}

/// Computes the next tax rate and reward weight from rolling indicators.
pub struct PolicyController<'p> {
    params: &'p PolicyParameters,
}

impl<'p> PolicyController<'p> {
    pub fn new(params: &'p PolicyParameters) -> Self {
        Self { params }
    }

    /// Next tax rate given the rate in force at `epoch`.
    pub fn next_tax_rate<S, C>(
        &self,
        indicators: &IndicatorEngine<'_, S, C>,
        epoch: u64,
        old: Dec,
    ) -> Result<Dec, TesseraError>
    where
        S: KvStore,
        C: ExchangeRateOracle + IssuanceLedger + ?Sized,
    {
        let trl_short = indicators.rolling_trl(epoch, self.params.window_short)?;
        if trl_short.is_zero() {
            debug!(epoch, "Short-window TRL is zero, keeping tax rate");
            return Ok(old);
        }
        let trl_long = indicators.rolling_trl(epoch, self.params.window_long)?;
        let proposed = old
            .checked_mul(trl_long.checked_add(self.params.mining_increment)?)?
            .checked_quo(trl_short)?;
        debug!(epoch, %trl_short, %trl_long, %proposed, "Tax rate proposal");
        self.params.tax_policy.clamp(old, proposed)
    }

    /// Next reward weight given the weight in force at `epoch`.
    pub fn next_reward_weight<S, C>(
        &self,
        indicators: &IndicatorEngine<'_, S, C>,
        epoch: u64,
        old: Dec,
    ) -> Result<Dec, TesseraError>
    where
        S: KvStore,
        C: ExchangeRateOracle + IssuanceLedger + ?Sized,
    {
        let smr_short = indicators.rolling_smr(epoch, self.params.window_short)?;
        if smr_short.is_zero() {
            debug!(epoch, "Short-window SMR is zero, keeping reward weight");
            return Ok(old);
        }
        let proposed = old
            .checked_mul(self.params.seigniorage_burden_target)?
            .checked_quo(smr_short)?;
        debug!(epoch, %smr_short, %proposed, "Reward weight proposal");
        self.params.reward_policy.clamp(old, proposed)
    }
}

/// Run one policy step at the end of `epoch` and persist the results for
/// `epoch + 1`. Also refreshes the per-denom tax caps.
pub fn update_policy<S, C>(
    keeper: &mut Keeper<S>,
    chain: &C,
    params: &PolicyParameters,
    epoch: u64,
) -> Result<PolicyUpdate, TesseraError>
where
    S: KvStore,
    C: ExchangeRateOracle + IssuanceLedger + ?Sized,
{
    let old_tax_rate = keeper.tax_rate(epoch)?;
    let old_reward_weight = keeper.reward_weight(epoch)?;

    let (tax_rate, reward_weight) = {
        let indicators = IndicatorEngine::new(&*keeper, chain);
        let controller = PolicyController::new(params);
        (
            controller.next_tax_rate(&indicators, epoch, old_tax_rate)?,
            controller.next_reward_weight(&indicators, epoch, old_reward_weight)?,
        )
    };

    let effective_epoch = epoch
        .checked_add(1)
        .ok_or_else(|| TesseraError::overflow("epoch counter"))?;
    keeper.set_tax_rate(effective_epoch, tax_rate)?;
    keeper.set_reward_weight(effective_epoch, reward_weight)?;
    refresh_tax_caps(keeper, chain, params, epoch)?;

    info!(
        epoch = effective_epoch,
        old_tax_rate = %old_tax_rate,
        %tax_rate,
        old_reward_weight = %old_reward_weight,
        %reward_weight,
        "Policy updated"
    );

    Ok(PolicyUpdate {
        effective_epoch,
        tax_rate,
        reward_weight,
    })
}

/// Re-derive the cap of every denom that has a stored cap or was taxed in
/// `epoch` from the reference cap at current exchange rates.
pub fn refresh_tax_caps<S, C>(
    keeper: &mut Keeper<S>,
    chain: &C,
    params: &PolicyParameters,
    epoch: u64,
) -> Result<(), TesseraError>
where
    S: KvStore,
    C: ExchangeRateOracle + ?Sized,
{
    let reference = &params.tax_policy.cap;
    let mut denoms: Vec<String> = keeper.tax_caps()?.into_iter().map(|(d, _)| d).collect();
    for (denom, _) in keeper.tax_proceeds(epoch)?.iter() {
        denoms.push(denom.to_string());
    }
    denoms.sort();
    denoms.dedup();

    for denom in denoms.iter().filter(|d| d.as_str() != NATIVE_DENOM) {
        let cap = if *denom == reference.denom {
            reference.amount
        } else {
            match chain.convert(Dec::from_amount(reference.amount)?, &reference.denom, denom) {
                Ok(converted) => converted.truncate_to_amount()?,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(denom = %denom, error = %e, "Tax cap unconvertible, using reference amount");
                    reference.amount
                }
            }
        };
        keeper.set_tax_cap(denom, cap)?;
    }
    Ok(())
}

impl<S: KvStore> Keeper<S> {
    /// Maximum tax charged per transfer of `denom`.
    ///
    /// The native asset is tax-exempt and always has cap zero. Other denoms
    /// use their stored cap, or the reference cap when none is stored yet.
    pub fn tax_cap(&self, denom: &str) -> Result<Amount, TesseraError> {
        if denom == NATIVE_DENOM {
            return Ok(0);
        }
        match self.stored_tax_cap(denom)? {
            Some(cap) => Ok(cap),
            None => Ok(self.params()?.tax_policy.cap.amount),
        }
    }
}
