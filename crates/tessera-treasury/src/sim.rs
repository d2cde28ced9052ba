// crates/tessera-treasury/src/sim.rs
//
// In-process stand-in for the rest of the chain: exchange-rate oracle,
// issuance ledger with per-epoch history, and a bank with balances.
//
// Built for tests and behind the `sim` feature, which the node binary
// enables. Cloning gives a snapshot; a host that aborts a block restores the
// snapshot it took before the block, which is how bank-side effects of a
// failed block are rolled back.

use std::collections::BTreeMap;

use tracing::trace;

use tessera_core::account::AccountId;
use tessera_core::coin::{Amount, Coin, NATIVE_DENOM};
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::{Bank, ExchangeRateOracle, IssuanceLedger};

/// Simulated oracle, issuance ledger, and bank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimChain {
    /// Price of one unit of each denom, in native units.
    rates: BTreeMap<String, Dec>,
    balances: BTreeMap<(AccountId, String), Amount>,
    supply: BTreeMap<String, Amount>,
    /// Epoch whose issuance is the live supply.
    epoch: u64,
    /// Supply recorded when each past epoch ended.
    history: BTreeMap<(String, u64), Amount>,
    /// Mints that may still succeed before the bank starts refusing.
    mint_budget: Option<usize>,
}

impl SimChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the native-unit price of `denom`.
    pub fn set_rate(&mut self, denom: &str, native_per_unit: Dec) {
        self.rates.insert(denom.to_string(), native_per_unit);
    }

    /// Remove the price of `denom`, making conversions through it fail.
    pub fn remove_rate(&mut self, denom: &str) {
        self.rates.remove(denom);
    }

    fn rate(&self, denom: &str) -> Option<Dec> {
        if denom == NATIVE_DENOM {
            return Some(Dec::one());
        }
        self.rates.get(denom).copied().filter(|r| r.is_positive())
    }

    /// Live supply of `denom`.
    pub fn supply(&self, denom: &str) -> Amount {
        self.supply.get(denom).copied().unwrap_or(0)
    }

    pub fn balance(&self, account: &AccountId, denom: &str) -> Amount {
        self.balances
            .get(&(*account, denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    /// Move the live epoch forward, recording the supply of every denom for
    /// each epoch that closes.
    pub fn advance_epoch(&mut self, epoch: u64) {
        while self.epoch < epoch {
            for (denom, amount) in &self.supply {
                self.history.insert((denom.clone(), self.epoch), *amount);
            }
            self.epoch += 1;
        }
    }

    /// Let `successes` more mints through, then refuse every mint.
    pub fn fail_mints_after(&mut self, successes: usize) {
        self.mint_budget = Some(successes);
    }

    /// Stop refusing mints.
    pub fn heal(&mut self) {
        self.mint_budget = None;
    }

    /// Sum of every balance of `denom`. Always equals `supply(denom)`.
    pub fn total_balances(&self, denom: &str) -> Amount {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

impl ExchangeRateOracle for SimChain {
    fn convert(&self, amount: Dec, from_denom: &str, to_denom: &str) -> Result<Dec, TesseraError> {
        if from_denom == to_denom {
            return Ok(amount);
        }
        let from = self.rate(from_denom).ok_or_else(|| {
            TesseraError::Conversion(format!("no exchange rate for {}", from_denom))
        })?;
        let to = self
            .rate(to_denom)
            .ok_or_else(|| TesseraError::Conversion(format!("no exchange rate for {}", to_denom)))?;
        amount.checked_mul(from)?.checked_quo(to)
    }
}

impl IssuanceLedger for SimChain {
    fn issuance(&self, denom: &str, epoch: u64) -> Result<Amount, TesseraError> {
        if epoch >= self.epoch {
            return Ok(self.supply(denom));
        }
        self.history
            .get(&(denom.to_string(), epoch))
            .copied()
            .ok_or_else(|| TesseraError::NotFound(format!("issuance of {} at epoch {}", denom, epoch)))
    }
}

impl Bank for SimChain {
    fn mint(&mut self, recipient: &AccountId, coin: &Coin) -> Result<(), TesseraError> {
        if let Some(budget) = self.mint_budget.as_mut() {
            if *budget == 0 {
                return Err(TesseraError::Collaborator(format!(
                    "bank refused to mint {} to {}",
                    coin, recipient
                )));
            }
            *budget -= 1;
        }
        let supply = self.supply.entry(coin.denom.clone()).or_insert(0);
        *supply = supply
            .checked_add(coin.amount)
            .ok_or_else(|| TesseraError::overflow(format!("supply of {}", coin.denom)))?;
        let balance = self
            .balances
            .entry((*recipient, coin.denom.clone()))
            .or_insert(0);
        *balance = balance
            .checked_add(coin.amount)
            .ok_or_else(|| TesseraError::overflow(format!("balance of {}", recipient)))?;
        trace!(%recipient, %coin, "Minted");
        Ok(())
    }

    fn burn(&mut self, payer: &AccountId, coin: &Coin) -> Result<(), TesseraError> {
        let key = (*payer, coin.denom.clone());
        let balance = self.balances.get(&key).copied().unwrap_or(0);
        let remaining = balance.checked_sub(coin.amount).ok_or_else(|| {
            TesseraError::Collaborator(format!(
                "insufficient funds: {} holds {}{} but burn needs {}",
                payer, balance, coin.denom, coin
            ))
        })?;
        self.balances.insert(key, remaining);
        let supply = self.supply.entry(coin.denom.clone()).or_insert(0);
        *supply = supply
            .checked_sub(coin.amount)
            .ok_or_else(|| TesseraError::overflow(format!("supply of {}", coin.denom)))?;
        trace!(%payer, %coin, "Burned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_convert_through_native_prices() {
        let mut chain = SimChain::new();
        chain.set_rate("usdr", dec("2"));
        chain.set_rate("ukrw", dec("0.002"));
        // 1000 ukrw = 2 utes = 1 usdr.
        assert_eq!(chain.convert(dec("1000"), "ukrw", "usdr").unwrap(), dec("1"));
        assert_eq!(chain.convert(dec("3"), "utes", "usdr").unwrap(), dec("1.5"));
        assert_eq!(chain.convert(dec("7"), "usdr", "usdr").unwrap(), dec("7"));
        assert!(matches!(
            chain.convert(dec("1"), "umnt", "usdr"),
            Err(TesseraError::Conversion(_))
        ));
    }

    #[test]
    fn test_mint_and_burn_track_supply() {
        let mut chain = SimChain::new();
        let alice = AccountId::new([1; 20]);
        chain.mint(&alice, &Coin::native(100)).unwrap();
        chain.burn(&alice, &Coin::native(30)).unwrap();
        assert_eq!(chain.balance(&alice, "utes"), 70);
        assert_eq!(chain.supply("utes"), 70);
        assert_eq!(chain.total_balances("utes"), 70);
        assert!(matches!(
            chain.burn(&alice, &Coin::native(71)),
            Err(TesseraError::Collaborator(_))
        ));
        assert_eq!(chain.supply("utes"), 70);
    }

    #[test]
    fn test_issuance_history() {
        let mut chain = SimChain::new();
        let alice = AccountId::new([1; 20]);
        chain.mint(&alice, &Coin::native(10)).unwrap();
        chain.advance_epoch(2);
        chain.mint(&alice, &Coin::native(5)).unwrap();
        assert_eq!(chain.issuance("utes", 0).unwrap(), 10);
        assert_eq!(chain.issuance("utes", 1).unwrap(), 10);
        assert_eq!(chain.issuance("utes", 2).unwrap(), 15);
        assert_eq!(chain.issuance("utes", 9).unwrap(), 15);
    }

    #[test]
    fn test_mint_fault_injection_and_snapshot() {
        let mut chain = SimChain::new();
        let alice = AccountId::new([1; 20]);
        let snapshot = chain.clone();
        chain.fail_mints_after(1);
        chain.mint(&alice, &Coin::native(1)).unwrap();
        assert!(chain.mint(&alice, &Coin::native(1)).is_err());
        chain = snapshot;
        assert_eq!(chain.supply("utes"), 0);
        chain.mint(&alice, &Coin::native(1)).unwrap();
    }
}
