// crates/tessera-treasury/src/epoch.rs
//
// Block height to epoch mapping and the named height predicates that drive
// the end blocker.
//
// An epoch is a fixed-length window of `blocks_per_epoch` blocks (default
// 100_800, one week at 10 blocks/min). Settlement runs on the last block of
// every `settlement_period` blocks; the period is always a whole number of
// epochs, so every settlement boundary is also the last block of an epoch.

use serde::{Deserialize, Serialize};

use tessera_core::error::TesseraError;

use crate::params::PolicyParameters;

/// Pure height arithmetic. Holds no state beyond its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochClock {
    blocks_per_epoch: u64,
    settlement_period: u64,
    window_probation: u64,
}

impl EpochClock {
    /// Create a clock.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidInput` if either length is zero or the
    /// settlement period is not a multiple of the epoch length.
    pub fn new(
        blocks_per_epoch: u64,
        settlement_period: u64,
        window_probation: u64,
    ) -> Result<Self, TesseraError> {
        if blocks_per_epoch == 0 {
            return Err(TesseraError::InvalidInput(
                "blocks_per_epoch must be positive".to_string(),
            ));
        }
        if settlement_period == 0 || settlement_period % blocks_per_epoch != 0 {
            return Err(TesseraError::InvalidInput(format!(
                "settlement_period {} must be a positive multiple of blocks_per_epoch {}",
                settlement_period, blocks_per_epoch
            )));
        }
        Ok(Self {
            blocks_per_epoch,
            settlement_period,
            window_probation,
        })
    }

    /// Build a clock from the stored policy parameters.
    pub fn from_params(params: &PolicyParameters) -> Result<Self, TesseraError> {
        Self::new(
            params.blocks_per_epoch,
            params.settlement_period,
            params.window_probation,
        )
    }

    pub fn blocks_per_epoch(&self) -> u64 {
        self.blocks_per_epoch
    }

    pub fn settlement_period(&self) -> u64 {
        self.settlement_period
    }

    /// `floor(height / blocks_per_epoch)`.
    pub fn epoch_of(&self, height: u64) -> u64 {
        height / self.blocks_per_epoch
    }

    /// Whether `height` is the final block of its epoch.
    pub fn is_last_block_of_epoch(&self, height: u64) -> bool {
        (height % self.blocks_per_epoch) + 1 == self.blocks_per_epoch
    }

    /// Whether `height` is the final block of a settlement period.
    pub fn is_settlement_boundary(&self, height: u64) -> bool {
        (height % self.settlement_period) + 1 == self.settlement_period
    }

    /// Whether policy updates are still suspended at `epoch`.
    pub fn is_in_probation(&self, epoch: u64) -> bool {
        epoch < self.window_probation
    }
}
