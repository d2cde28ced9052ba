// crates/tessera-treasury/src/indicator.rs
//
// Economic indicators derived from per-epoch revenue.
//
// Revenue in the reference currency:
//   - tax revenue: the epoch's tax proceeds converted coin by coin
//   - seigniorage revenue: reward_weight(epoch) * seigniorage pool, converted
//   - mining reward: tax + seigniorage revenue
//
// Unit indicators divide by the native issuance of the epoch (TRL, SRL,
// MRL: tax / seigniorage / mining reward per unit of native asset). SMR is
// the seigniorage share of mining rewards. Rolling averages walk the window
// backward epoch by epoch and accept any indicator callback.
//
// Conversion failures never abort: the affected revenue contributes zero.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tessera_core::coin::{Amount, NATIVE_DENOM, REFERENCE_DENOM};
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::{ExchangeRateOracle, IssuanceLedger, KvStore};

use crate::keeper::Keeper;
use crate::params::PolicyParameters;

/// Average of `f(e)` over the last `window` epochs ending at `current`,
/// inclusive, clipped at epoch 0. A non-positive window yields zero.
pub fn rolling_average<F>(current: u64, window: i64, mut f: F) -> Result<Dec, TesseraError>
where
    F: FnMut(u64) -> Result<Dec, TesseraError>,
{
    if window <= 0 {
        return Ok(Dec::zero());
    }
    let span = window as u64;
    let oldest = current.saturating_sub(span - 1);

    let mut sum = Dec::zero();
    let mut count: Amount = 0;
    let mut epoch = current;
    loop {
        sum = sum.checked_add(f(epoch)?)?;
        count += 1;
        if epoch == oldest {
            break;
        }
        epoch -= 1;
    }
    sum.quo_int(count)
}

/// Indicator snapshot for one epoch, as returned by the querier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicators {
    pub epoch: u64,
    pub tax_revenue: Dec,
    pub seigniorage_revenue: Dec,
    pub mining_reward: Dec,
    pub trl: Dec,
    pub srl: Dec,
    pub mrl: Dec,
    pub smr: Dec,
    pub trl_short: Dec,
    pub trl_long: Dec,
    pub smr_short: Dec,
}

/// Reads revenue history from the keeper and converts it with the oracle.
pub struct IndicatorEngine<'a, S, C: ?Sized> {
    keeper: &'a Keeper<S>,
    chain: &'a C,
}

impl<'a, S, C> IndicatorEngine<'a, S, C>
where
    S: KvStore,
    C: ExchangeRateOracle + IssuanceLedger + ?Sized,
{
    pub fn new(keeper: &'a Keeper<S>, chain: &'a C) -> Self {
        Self { keeper, chain }
    }

    /// Tax proceeds of `epoch` in the reference currency.
    pub fn tax_revenue(&self, epoch: u64) -> Result<Dec, TesseraError> {
        let proceeds = self.keeper.tax_proceeds(epoch)?;
        let mut total = Dec::zero();
        for (denom, amount) in proceeds.iter() {
            let amount = Dec::from_amount(amount)?;
            if denom == REFERENCE_DENOM {
                total = total.checked_add(amount)?;
                continue;
            }
            match self.chain.convert(amount, denom, REFERENCE_DENOM) {
                Ok(converted) => total = total.checked_add(converted)?,
                Err(e) if !e.is_fatal() => {
                    debug!(epoch, denom, error = %e, "Skipping unconvertible tax proceeds")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    /// Seigniorage routed to mining rewards in `epoch`, in the reference currency.
    pub fn seigniorage_revenue(&self, epoch: u64) -> Result<Dec, TesseraError> {
        let pool = self.keeper.seigniorage_pool(epoch)?;
        if pool == 0 {
            return Ok(Dec::zero());
        }
        let reward = self.keeper.reward_weight(epoch)?.mul_int(pool)?;
        match self.chain.convert(reward, NATIVE_DENOM, REFERENCE_DENOM) {
            Ok(converted) => Ok(converted),
            Err(e) if !e.is_fatal() => {
                debug!(epoch, error = %e, "Seigniorage revenue unconvertible, counting zero");
                Ok(Dec::zero())
            }
            Err(e) => Err(e),
        }
    }

    pub fn mining_reward(&self, epoch: u64) -> Result<Dec, TesseraError> {
        self.tax_revenue(epoch)?
            .checked_add(self.seigniorage_revenue(epoch)?)
    }

    /// Native issuance at `epoch`: the end-of-epoch snapshot when the epoch
    /// has closed, otherwise the ledger's figure.
    pub fn issuance(&self, epoch: u64) -> Result<Amount, TesseraError> {
        match self.keeper.issuance_snapshot(epoch)? {
            Some(issuance) => Ok(issuance),
            None => self.chain.issuance(NATIVE_DENOM, epoch),
        }
    }

    /// `value / issuance(epoch)`, zero when issuance is zero.
    fn per_unit(&self, epoch: u64, value: Dec) -> Result<Dec, TesseraError> {
        let issuance = self.issuance(epoch)?;
        if issuance == 0 {
            return Ok(Dec::zero());
        }
        value.quo_int(issuance)
    }

    /// Tax revenue per unit of native issuance.
    pub fn trl(&self, epoch: u64) -> Result<Dec, TesseraError> {
        self.per_unit(epoch, self.tax_revenue(epoch)?)
    }

    /// Seigniorage revenue per unit of native issuance.
    pub fn srl(&self, epoch: u64) -> Result<Dec, TesseraError> {
        self.per_unit(epoch, self.seigniorage_revenue(epoch)?)
    }

    /// Mining reward per unit of native issuance.
    pub fn mrl(&self, epoch: u64) -> Result<Dec, TesseraError> {
        self.per_unit(epoch, self.mining_reward(epoch)?)
    }

    /// Seigniorage share of mining rewards, zero when there were none.
    pub fn smr(&self, epoch: u64) -> Result<Dec, TesseraError> {
        let seigniorage = self.seigniorage_revenue(epoch)?;
        let total = self.tax_revenue(epoch)?.checked_add(seigniorage)?;
        if total.is_zero() {
            return Ok(Dec::zero());
        }
        seigniorage.checked_quo(total)
    }

    pub fn rolling_trl(&self, epoch: u64, window: i64) -> Result<Dec, TesseraError> {
        rolling_average(epoch, window, |e| self.trl(e))
    }

    pub fn rolling_smr(&self, epoch: u64, window: i64) -> Result<Dec, TesseraError> {
        rolling_average(epoch, window, |e| self.smr(e))
    }

    pub fn rolling_mrl(&self, epoch: u64, window: i64) -> Result<Dec, TesseraError> {
        rolling_average(epoch, window, |e| self.mrl(e))
    }

    /// Every indicator for `epoch`, with rolling windows from `params`.
    pub fn snapshot(&self, epoch: u64, params: &PolicyParameters) -> Result<Indicators, TesseraError> {
        let tax_revenue = self.tax_revenue(epoch)?;
        let seigniorage_revenue = self.seigniorage_revenue(epoch)?;
        Ok(Indicators {
            epoch,
            tax_revenue,
            seigniorage_revenue,
            mining_reward: tax_revenue.checked_add(seigniorage_revenue)?,
            trl: self.trl(epoch)?,
            srl: self.srl(epoch)?,
            mrl: self.mrl(epoch)?,
            smr: self.smr(epoch)?,
            trl_short: self.rolling_trl(epoch, params.window_short)?,
            trl_long: self.rolling_trl(epoch, params.window_long)?,
            smr_short: self.rolling_smr(epoch, params.window_short)?,
        })
    }
}
