// crates/tessera-treasury/src/revenue.rs
//
// Per-epoch revenue records: stability-tax proceeds (a coin basket) and the
// seigniorage pool (native tokens minted but not yet assigned).
//
// External modules push revenue here; the engine only reads it back when
// computing indicators. The native asset is tax-exempt, so native coins in a
// tax report are rejected rather than recorded. Each epoch's per-denom total
// is bounded by `MAX_EPOCH_REVENUE` so indicators can always lift it into a
// `Dec`.

use tracing::warn;

use tessera_core::coin::{Amount, Coins, NATIVE_DENOM};
use tessera_core::error::TesseraError;
use tessera_core::traits::KvStore;

use crate::keeper::{epoch_key, Keeper, SEIGNIORAGE_PREFIX, TAX_PROCEEDS_PREFIX};

/// Largest total a single denom may reach in one epoch's revenue records.
pub const MAX_EPOCH_REVENUE: Amount = 100_000_000_000_000_000_000;

fn check_epoch_total(epoch: u64, denom: &str, total: Amount) -> Result<(), TesseraError> {
    if total > MAX_EPOCH_REVENUE {
        warn!(epoch, denom, total, "Rejected revenue above the per-epoch limit");
        return Err(TesseraError::InvalidInput(format!(
            "epoch {} {} revenue {} would exceed the limit {}",
            epoch, denom, total, MAX_EPOCH_REVENUE
        )));
    }
    Ok(())
}

impl<S: KvStore> Keeper<S> {
    /// Add `coins` to the tax proceeds of `epoch`.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidInput` if the basket contains the
    /// native denomination or would push any denom of the epoch past
    /// `MAX_EPOCH_REVENUE`.
    pub fn record_tax_proceeds(&mut self, epoch: u64, coins: &Coins) -> Result<(), TesseraError> {
        if coins.amount_of(NATIVE_DENOM) > 0 {
            warn!(epoch, coins = %coins, "Rejected tax proceeds in the tax-exempt native denom");
            return Err(TesseraError::InvalidInput(format!(
                "tax proceeds may not contain the native denom {}",
                NATIVE_DENOM
            )));
        }
        if coins.is_empty() {
            return Ok(());
        }
        let mut proceeds = self.tax_proceeds(epoch)?;
        proceeds.merge(coins).map_err(|_| {
            TesseraError::InvalidInput(format!("tax proceeds of epoch {} overflow", epoch))
        })?;
        for (denom, total) in proceeds.iter() {
            check_epoch_total(epoch, denom, total)?;
        }
        self.put_json(&epoch_key(TAX_PROCEEDS_PREFIX, epoch), &proceeds)
    }

    /// Tax proceeds recorded for `epoch` (empty if none).
    pub fn tax_proceeds(&self, epoch: u64) -> Result<Coins, TesseraError> {
        Ok(self
            .get_json(&epoch_key(TAX_PROCEEDS_PREFIX, epoch))?
            .unwrap_or_default())
    }

    /// Add `amount` of native seigniorage to the pool of `epoch`.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidInput` if the pool would exceed
    /// `MAX_EPOCH_REVENUE`.
    pub fn add_seigniorage(&mut self, epoch: u64, amount: Amount) -> Result<(), TesseraError> {
        if amount == 0 {
            return Ok(());
        }
        let pool = self
            .seigniorage_pool(epoch)?
            .checked_add(amount)
            .unwrap_or(Amount::MAX);
        check_epoch_total(epoch, NATIVE_DENOM, pool)?;
        self.put_json(&epoch_key(SEIGNIORAGE_PREFIX, epoch), &pool)
    }

    /// Seigniorage pool recorded for `epoch` (zero if none).
    pub fn seigniorage_pool(&self, epoch: u64) -> Result<Amount, TesseraError> {
        Ok(self
            .get_json(&epoch_key(SEIGNIORAGE_PREFIX, epoch))?
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::coin::Coin;
    use tessera_store::MemStore;

    fn basket(coins: &[(&str, Amount)]) -> Coins {
        let coins: Vec<Coin> = coins
            .iter()
            .map(|(d, a)| Coin::new(*d, *a).unwrap())
            .collect();
        Coins::from_coins(&coins).unwrap()
    }

    #[test]
    fn test_tax_proceeds_accumulate_per_epoch() {
        let mut keeper = Keeper::new(MemStore::new());
        keeper
            .record_tax_proceeds(3, &basket(&[("usdr", 10), ("ukrw", 5)]))
            .unwrap();
        keeper.record_tax_proceeds(3, &basket(&[("usdr", 7)])).unwrap();
        keeper.record_tax_proceeds(4, &basket(&[("usdr", 1)])).unwrap();

        let proceeds = keeper.tax_proceeds(3).unwrap();
        assert_eq!(proceeds.amount_of("usdr"), 17);
        assert_eq!(proceeds.amount_of("ukrw"), 5);
        assert_eq!(keeper.tax_proceeds(4).unwrap().amount_of("usdr"), 1);
        assert!(keeper.tax_proceeds(5).unwrap().is_empty());
    }

    #[test]
    fn test_native_tax_proceeds_rejected() {
        let mut keeper = Keeper::new(MemStore::new());
        let result = keeper.record_tax_proceeds(0, &basket(&[("utes", 10), ("usdr", 1)]));
        assert!(matches!(result, Err(TesseraError::InvalidInput(_))));
        // Nothing recorded, not even the taxable part.
        assert!(keeper.tax_proceeds(0).unwrap().is_empty());
    }

    #[test]
    fn test_seigniorage_accumulates() {
        let mut keeper = Keeper::new(MemStore::new());
        keeper.add_seigniorage(2, 100).unwrap();
        keeper.add_seigniorage(2, 50).unwrap();
        keeper.add_seigniorage(2, 0).unwrap();
        assert_eq!(keeper.seigniorage_pool(2).unwrap(), 150);
        assert_eq!(keeper.seigniorage_pool(1).unwrap(), 0);
    }

    #[test]
    fn test_seigniorage_above_limit_rejected() {
        let mut keeper = Keeper::new(MemStore::new());
        assert!(matches!(
            keeper.add_seigniorage(0, u128::MAX),
            Err(TesseraError::InvalidInput(_))
        ));
        keeper.add_seigniorage(0, MAX_EPOCH_REVENUE - 1).unwrap();
        keeper.add_seigniorage(0, 1).unwrap();
        let err = keeper.add_seigniorage(0, 1).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidInput(_)));
        assert_eq!(keeper.seigniorage_pool(0).unwrap(), MAX_EPOCH_REVENUE);
    }

    #[test]
    fn test_oversized_tax_report_rejected() {
        let mut keeper = Keeper::new(MemStore::new());
        let huge = basket(&[("usdr", 1_000_000_000_000_000_000_000)]);
        assert!(matches!(
            keeper.record_tax_proceeds(0, &huge),
            Err(TesseraError::InvalidInput(_))
        ));
        assert!(keeper.tax_proceeds(0).unwrap().is_empty());
    }

    #[test]
    fn test_cumulative_tax_limit_per_denom() {
        let mut keeper = Keeper::new(MemStore::new());
        let half = MAX_EPOCH_REVENUE / 2;
        keeper
            .record_tax_proceeds(1, &basket(&[("usdr", half), ("ukrw", 5)]))
            .unwrap();
        keeper.record_tax_proceeds(1, &basket(&[("usdr", half)])).unwrap();
        let result = keeper.record_tax_proceeds(1, &basket(&[("ukrw", 1), ("usdr", 1)]));
        assert!(matches!(result, Err(TesseraError::InvalidInput(_))));

        // The rejected report left no partial trace and other epochs are unaffected.
        let proceeds = keeper.tax_proceeds(1).unwrap();
        assert_eq!(proceeds.amount_of("usdr"), MAX_EPOCH_REVENUE);
        assert_eq!(proceeds.amount_of("ukrw"), 5);
        keeper.record_tax_proceeds(2, &basket(&[("usdr", half)])).unwrap();
    }
}
