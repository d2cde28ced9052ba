// crates/tessera-treasury/src/params.rs
//
// Policy parameters for the treasury, with their defaults and validation.
//
// Parameters are part of genesis and persisted under the `params` key. They
// change only through a validated `ParamsUpdateProposal`; nothing in the
// engine mutates them.

use serde::{Deserialize, Serialize};

use tessera_core::coin::{Amount, Coin, MICRO_UNIT, REFERENCE_DENOM};
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;

use crate::claims::ClaimClass;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Lowest tax rate the policy may reach: 0.05%.
pub const DEFAULT_TAX_RATE_MIN: Dec = Dec::with_prec(5, 4);

/// Highest tax rate the policy may reach: 1%.
pub const DEFAULT_TAX_RATE_MAX: Dec = Dec::with_prec(1, 2);

/// Largest change of the tax rate per update: 0.025%.
pub const DEFAULT_TAX_RATE_STEP: Dec = Dec::with_prec(25, 5);

/// Tax cap in the reference denomination: 1 SDR.
pub const DEFAULT_TAX_CAP: Amount = MICRO_UNIT;

pub const DEFAULT_REWARD_WEIGHT_MIN: Dec = Dec::with_prec(5, 2);
pub const DEFAULT_REWARD_WEIGHT_MAX: Dec = Dec::with_prec(50, 2);
pub const DEFAULT_REWARD_WEIGHT_STEP: Dec = Dec::with_prec(25, 3);

/// Target share of seigniorage in mining rewards.
pub const DEFAULT_SEIGNIORAGE_BURDEN_TARGET: Dec = Dec::with_prec(67, 2);

/// Targeted per-update growth factor of mining rewards.
pub const DEFAULT_MINING_INCREMENT: Dec = Dec::with_prec(107, 2);

/// Epochs in the short rolling window (about a month).
pub const DEFAULT_WINDOW_SHORT: i64 = 4;

/// Epochs in the long rolling window (about a year).
pub const DEFAULT_WINDOW_LONG: i64 = 52;

/// Epochs after genesis during which the policy is frozen (about three months).
pub const DEFAULT_WINDOW_PROBATION: u64 = 12;

/// One week at 10 blocks per minute.
pub const DEFAULT_BLOCKS_PER_EPOCH: u64 = 100_800;

/// Native-asset issuance that settlement steers toward.
pub const DEFAULT_TARGET_ISSUANCE: Amount = 1_000_000_000 * MICRO_UNIT;

pub const DEFAULT_ORACLE_CLAIM_SHARE: Dec = Dec::with_prec(1, 1);
pub const DEFAULT_BUDGET_CLAIM_SHARE: Dec = Dec::with_prec(9, 1);

/// Tax rate in force at genesis.
pub const DEFAULT_GENESIS_TAX_RATE: Dec = Dec::with_prec(1, 3);

/// Reward weight in force at genesis.
pub const DEFAULT_GENESIS_REWARD_WEIGHT: Dec = Dec::with_prec(5, 2);

// ---------------------------------------------------------------------------
// PolicyConstraints
// ---------------------------------------------------------------------------

/// Absolute bounds, step limit, and cap for one adaptive policy register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConstraints {
    pub rate_min: Dec,
    pub rate_max: Dec,
    pub change_rate_max: Dec,
    pub cap: Coin,
}

impl PolicyConstraints {
    /// Two-stage clamp of a proposed update.
    ///
    /// First bounds the change to `[old - change_rate_max, old + change_rate_max]`,
    /// then bounds the result to `[rate_min, rate_max]`. The order matters at
    /// the range edges and must not be swapped.
    pub fn clamp(&self, old: Dec, proposed: Dec) -> Result<Dec, TesseraError> {
        let lower = old.checked_sub(self.change_rate_max)?;
        let upper = old.checked_add(self.change_rate_max)?;
        let stepped = proposed.max(lower).min(upper);
        Ok(stepped.max(self.rate_min).min(self.rate_max))
    }

    /// Clamp a value into the absolute bounds only.
    pub fn bound(&self, value: Dec) -> Dec {
        value.max(self.rate_min).min(self.rate_max)
    }

    /// Whether `value` lies within the absolute bounds.
    pub fn contains(&self, value: Dec) -> bool {
        self.rate_min <= value && value <= self.rate_max
    }

    fn validate(&self, name: &str) -> Result<(), TesseraError> {
        if self.rate_min.is_negative() {
            return Err(TesseraError::InvalidInput(format!(
                "{} rate_min must not be negative: {}",
                name, self.rate_min
            )));
        }
        if self.rate_min > self.rate_max {
            return Err(TesseraError::InvalidInput(format!(
                "{} rate_min {} exceeds rate_max {}",
                name, self.rate_min, self.rate_max
            )));
        }
        if self.change_rate_max.is_negative() {
            return Err(TesseraError::InvalidInput(format!(
                "{} change_rate_max must not be negative: {}",
                name, self.change_rate_max
            )));
        }
        if self.cap.amount > Dec::MAX_AMOUNT {
            return Err(TesseraError::InvalidInput(format!(
                "{} cap {} exceeds the largest representable amount {}",
                name, self.cap, Dec::MAX_AMOUNT
            )));
        }
        tessera_core::coin::validate_denom(&self.cap.denom)
    }
}

// ---------------------------------------------------------------------------
// PolicyParameters
// ---------------------------------------------------------------------------

/// Every tunable of the treasury.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyParameters {
    pub tax_policy: PolicyConstraints,
    pub reward_policy: PolicyConstraints,
    /// Target ratio of seigniorage to total mining rewards.
    pub seigniorage_burden_target: Dec,
    pub mining_increment: Dec,
    /// Epochs averaged for short-run indicators.
    pub window_short: i64,
    /// Epochs averaged for long-run indicators.
    pub window_long: i64,
    /// Epochs after genesis during which policy updates are suspended.
    pub window_probation: u64,
    /// Native-asset issuance settlement burns or mints toward.
    pub target_issuance: Amount,
    pub oracle_claim_share: Dec,
    pub budget_claim_share: Dec,
    pub blocks_per_epoch: u64,
    /// Blocks between settlements; a multiple of `blocks_per_epoch`.
    pub settlement_period: u64,
}

impl Default for PolicyParameters {
    fn default() -> Self {
        Self {
            tax_policy: PolicyConstraints {
                rate_min: DEFAULT_TAX_RATE_MIN,
                rate_max: DEFAULT_TAX_RATE_MAX,
                change_rate_max: DEFAULT_TAX_RATE_STEP,
                cap: Coin {
                    denom: REFERENCE_DENOM.to_string(),
                    amount: DEFAULT_TAX_CAP,
                },
            },
            reward_policy: PolicyConstraints {
                rate_min: DEFAULT_REWARD_WEIGHT_MIN,
                rate_max: DEFAULT_REWARD_WEIGHT_MAX,
                change_rate_max: DEFAULT_REWARD_WEIGHT_STEP,
                // Reward weight has no cap.
                cap: Coin {
                    denom: REFERENCE_DENOM.to_string(),
                    amount: 0,
                },
            },
            seigniorage_burden_target: DEFAULT_SEIGNIORAGE_BURDEN_TARGET,
            mining_increment: DEFAULT_MINING_INCREMENT,
            window_short: DEFAULT_WINDOW_SHORT,
            window_long: DEFAULT_WINDOW_LONG,
            window_probation: DEFAULT_WINDOW_PROBATION,
            target_issuance: DEFAULT_TARGET_ISSUANCE,
            oracle_claim_share: DEFAULT_ORACLE_CLAIM_SHARE,
            budget_claim_share: DEFAULT_BUDGET_CLAIM_SHARE,
            blocks_per_epoch: DEFAULT_BLOCKS_PER_EPOCH,
            settlement_period: DEFAULT_BLOCKS_PER_EPOCH,
        }
    }
}

impl PolicyParameters {
    /// Check every parameter.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidInput` naming the first offending field.
    pub fn validate(&self) -> Result<(), TesseraError> {
        self.tax_policy.validate("tax_policy")?;
        self.reward_policy.validate("reward_policy")?;

        if self.reward_policy.rate_max > Dec::one() {
            return Err(TesseraError::InvalidInput(format!(
                "reward_policy rate_max must not exceed 1: {}",
                self.reward_policy.rate_max
            )));
        }
        if self.seigniorage_burden_target.is_negative() {
            return Err(TesseraError::InvalidInput(format!(
                "seigniorage_burden_target must not be negative: {}",
                self.seigniorage_burden_target
            )));
        }
        if self.mining_increment.is_negative() {
            return Err(TesseraError::InvalidInput(format!(
                "mining_increment must not be negative: {}",
                self.mining_increment
            )));
        }
        if self.window_short < 0 {
            return Err(TesseraError::InvalidInput(format!(
                "window_short must not be negative: {}",
                self.window_short
            )));
        }
        if self.window_long <= self.window_short {
            return Err(TesseraError::InvalidInput(format!(
                "window_long {} must be greater than window_short {}",
                self.window_long, self.window_short
            )));
        }
        if self.oracle_claim_share.is_negative() || self.budget_claim_share.is_negative() {
            return Err(TesseraError::InvalidInput(
                "claim shares must not be negative".to_string(),
            ));
        }
        if self
            .oracle_claim_share
            .checked_add(self.budget_claim_share)?
            != Dec::one()
        {
            return Err(TesseraError::InvalidInput(format!(
                "claim shares must sum to 1: oracle {} + budget {}",
                self.oracle_claim_share, self.budget_claim_share
            )));
        }
        if self.blocks_per_epoch == 0 {
            return Err(TesseraError::InvalidInput(
                "blocks_per_epoch must be positive".to_string(),
            ));
        }
        if self.settlement_period == 0 || self.settlement_period % self.blocks_per_epoch != 0 {
            return Err(TesseraError::InvalidInput(format!(
                "settlement_period {} must be a positive multiple of blocks_per_epoch {}",
                self.settlement_period, self.blocks_per_epoch
            )));
        }
        Ok(())
    }

    /// Fraction of the claim pool reserved for `class`.
    pub fn claim_share(&self, class: ClaimClass) -> Dec {
        match class {
            ClaimClass::Oracle => self.oracle_claim_share,
            ClaimClass::Budget => self.budget_claim_share,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_params_are_valid() {
        let params = PolicyParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.tax_policy.rate_min, dec("0.0005"));
        assert_eq!(params.tax_policy.change_rate_max, dec("0.00025"));
        assert_eq!(params.reward_policy.rate_max, dec("0.5"));
        assert_eq!(params.mining_increment, dec("1.07"));
        assert_eq!(params.claim_share(ClaimClass::Oracle), dec("0.1"));
        assert_eq!(params.claim_share(ClaimClass::Budget), dec("0.9"));
    }

    #[test]
    fn test_clamp_limits_step_first() {
        let policy = PolicyParameters::default().tax_policy;
        // Proposed far above: one step up from old.
        assert_eq!(
            policy.clamp(dec("0.001"), dec("0.5")).unwrap(),
            dec("0.00125")
        );
        // Proposed far below: one step down.
        assert_eq!(
            policy.clamp(dec("0.001"), dec("0")).unwrap(),
            dec("0.00075")
        );
        // Within step and range: unchanged.
        assert_eq!(
            policy.clamp(dec("0.001"), dec("0.0011")).unwrap(),
            dec("0.0011")
        );
    }

    #[test]
    fn test_clamp_then_bounds_range() {
        let policy = PolicyParameters::default().tax_policy;
        // One step up from near the top would exceed rate_max.
        assert_eq!(
            policy.clamp(dec("0.0099"), dec("1")).unwrap(),
            dec("0.01")
        );
        // One step down from near the bottom would go below rate_min.
        assert_eq!(
            policy.clamp(dec("0.0006"), dec("0")).unwrap(),
            dec("0.0005")
        );
    }

    #[test]
    fn test_clamp_order_matters_outside_range() {
        // Old value sits outside the range (e.g. after a range change).
        // Step clamp keeps it at old+step, then the range pulls it to rate_min.
        let policy = PolicyConstraints {
            rate_min: dec("0.5"),
            rate_max: dec("0.6"),
            change_rate_max: dec("0.01"),
            cap: Coin::new("usdr", 0).unwrap(),
        };
        assert_eq!(policy.clamp(dec("0.1"), dec("0.55")).unwrap(), dec("0.5"));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut params = PolicyParameters::default();
        params.tax_policy.rate_min = dec("0.02");
        assert!(matches!(
            params.validate(),
            Err(TesseraError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_windows_and_shares() {
        let mut params = PolicyParameters::default();
        params.window_long = params.window_short;
        assert!(params.validate().is_err());

        let mut params = PolicyParameters::default();
        params.oracle_claim_share = dec("0.2");
        assert!(params.validate().is_err());

        let mut params = PolicyParameters::default();
        params.reward_policy.rate_max = dec("1.5");
        assert!(params.validate().is_err());

        let mut params = PolicyParameters::default();
        params.settlement_period = params.blocks_per_epoch + 1;
        assert!(params.validate().is_err());

        let mut params = PolicyParameters::default();
        params.mining_increment = dec("-1");
        assert!(params.validate().is_err());

        let mut params = PolicyParameters::default();
        params.tax_policy.cap.amount = Dec::MAX_AMOUNT + 1;
        assert!(matches!(
            params.validate(),
            Err(TesseraError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_params_json_roundtrip() {
        let params = PolicyParameters::default();
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"rate_min\":\"0.000500000000000000\""));
        let back: PolicyParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
