// crates/tessera-treasury/src/end_blocker.rs
//
// The treasury facade and its per-block entry point.
//
// Every mutating call runs inside a `CacheStore` over the committed store
// and commits its writes as one batch only when the whole call succeeds.
// `execute_block` does, in order:
//   1. skip heights already processed (idempotence)
//   2. deliver the block's inputs (revenue, income, claims)
//   3. on the last block of an epoch, snapshot native issuance
//   4. on a settlement boundary, settle claims
//   5. on a settlement boundary outside probation, update the policy
//   6. record the height
// Bank operations from settlement are applied last. If anything fails the
// cache is dropped and the store is untouched, inputs included, so a retried
// block counts its inputs once. The host rolls back whatever the bank
// already did as part of aborting the block.

use tracing::{debug, info, trace, warn};

use tessera_core::account::AccountId;
use tessera_core::coin::{validate_denom, Amount, Coin, Coins, NATIVE_DENOM};
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::{Bank, ExchangeRateOracle, IssuanceLedger, KvStore};
use tessera_store::CacheStore;

use crate::claims::ClaimClass;
use crate::epoch::EpochClock;
use crate::events::TreasuryEvent;
use crate::keeper::Keeper;
use crate::policy::update_policy;
use crate::settlement::treasury_account;

/// The treasury engine over a committed store.
#[derive(Debug)]
pub struct Treasury<S: KvStore> {
    store: S,
}

impl<S: KvStore> Treasury<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The committed store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Read-only keeper over committed state. Writes made through it are
    /// never committed.
    pub fn view(&self) -> Keeper<CacheStore<'_, S>> {
        Keeper::new(CacheStore::new(&self.store))
    }

    /// Run `f` against a cached keeper and commit its writes only if it
    /// returns `Ok`.
    pub fn transact<T, F>(&mut self, f: F) -> Result<T, TesseraError>
    where
        F: FnOnce(&mut Keeper<CacheStore<'_, S>>) -> Result<T, TesseraError>,
    {
        let (result, batch) = {
            let mut keeper = Keeper::new(CacheStore::new(&self.store));
            let result = f(&mut keeper)?;
            (result, keeper.into_inner().into_batch())
        };
        if !batch.is_empty() {
            self.store.write_batch(batch)?;
        }
        Ok(result)
    }

    /// Clock built from the stored parameters.
    pub fn clock(&self) -> Result<EpochClock, TesseraError> {
        EpochClock::from_params(&self.view().params()?)
    }

    /// Epoch of the block currently being executed: the one after the last
    /// processed height, or epoch 0 before the first block.
    pub fn open_epoch(&self) -> Result<u64, TesseraError> {
        open_epoch(&self.view())
    }

    // -- revenue and claims ---------------------------------------------------

    /// Record tax proceeds for the open epoch.
    ///
    /// # Errors
    /// `InvalidInput` if `epoch` is not the open epoch (closed epochs are
    /// immutable and future ones are not yet observable) or the basket holds
    /// the native denom.
    pub fn record_tax_proceeds(&mut self, epoch: u64, coins: &Coins) -> Result<(), TesseraError> {
        self.transact(|keeper| {
            check_open_epoch(keeper, epoch)?;
            keeper.record_tax_proceeds(epoch, coins)
        })
    }

    /// Add native seigniorage to the open epoch's pool.
    pub fn add_seigniorage(&mut self, epoch: u64, amount: Amount) -> Result<(), TesseraError> {
        self.transact(|keeper| {
            check_open_epoch(keeper, epoch)?;
            keeper.add_seigniorage(epoch, amount)
        })
    }

    /// Add a weighted claim for the next settlement.
    pub fn add_claim(
        &mut self,
        class: ClaimClass,
        beneficiary: &AccountId,
        weight: Dec,
    ) -> Result<(), TesseraError> {
        self.transact(|keeper| keeper.add_claim(class, beneficiary, weight))
    }

    /// Record native income the caller has already credited to the treasury
    /// account. Zero is a no-op.
    pub fn add_income(&mut self, amount: Amount) -> Result<(), TesseraError> {
        if amount == 0 {
            return Ok(());
        }
        self.transact(|keeper| keeper.add_income(amount))
    }

    /// Mint `coin` straight to `requester`, bypassing the claim pool.
    pub fn request_funds<B: Bank + ?Sized>(
        &self,
        bank: &mut B,
        requester: &AccountId,
        coin: &Coin,
    ) -> Result<(), TesseraError> {
        validate_denom(&coin.denom)?;
        if coin.is_zero() {
            warn!(%requester, "Rejected zero-amount funds request");
            return Err(TesseraError::InvalidInput(
                "requested amount must be positive".to_string(),
            ));
        }
        bank.mint(requester, coin)?;
        info!(%requester, %coin, "Funds granted");
        Ok(())
    }

    // -- read-only queries used by the tax path -----------------------------

    pub fn tax_rate(&self, epoch: u64) -> Result<Dec, TesseraError> {
        self.view().tax_rate(epoch)
    }

    pub fn reward_weight(&self, epoch: u64) -> Result<Dec, TesseraError> {
        self.view().reward_weight(epoch)
    }

    pub fn tax_cap(&self, denom: &str) -> Result<Amount, TesseraError> {
        self.view().tax_cap(denom)
    }

    // -- per-block entry point ----------------------------------------------

    /// Process the end of block `height` with no inputs of its own.
    ///
    /// Returns the events produced. A height at or below the last processed
    /// one is a no-op returning no events.
    pub fn end_block<C>(&mut self, height: u64, chain: &mut C) -> Result<Vec<TreasuryEvent>, TesseraError>
    where
        C: ExchangeRateOracle + IssuanceLedger + Bank + ?Sized,
    {
        self.execute_block(height, chain, |_, _| Ok(()))
    }

    /// Deliver block `height`'s inputs through `deliver`, then process its
    /// end, all in one transaction.
    ///
    /// `deliver` may also move funds on `chain`, e.g. crediting income to
    /// the treasury account. An already processed height skips `deliver`.
    pub fn execute_block<C, F>(
        &mut self,
        height: u64,
        chain: &mut C,
        deliver: F,
    ) -> Result<Vec<TreasuryEvent>, TesseraError>
    where
        C: ExchangeRateOracle + IssuanceLedger + Bank + ?Sized,
        F: FnOnce(&mut BlockInputs<'_, CacheStore<'_, S>>, &mut C) -> Result<(), TesseraError>,
    {
        self.transact(|keeper| {
            if let Some(last) = keeper.last_height()? {
                if height <= last {
                    debug!(height, last, "Block already processed");
                    return Ok(Vec::new());
                }
            }
            let epoch = EpochClock::from_params(&keeper.params()?)?.epoch_of(height);
            deliver(
                &mut BlockInputs {
                    keeper: &mut *keeper,
                    epoch,
                },
                chain,
            )?;
            process_end_block(keeper, height, chain)
        })
    }
}

/// Inputs of the block being executed, all booked against its epoch.
pub struct BlockInputs<'k, S: KvStore> {
    keeper: &'k mut Keeper<S>,
    epoch: u64,
}

impl<'k, S: KvStore> BlockInputs<'k, S> {
    /// Epoch the block belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn record_tax_proceeds(&mut self, coins: &Coins) -> Result<(), TesseraError> {
        self.keeper.record_tax_proceeds(self.epoch, coins)
    }

    pub fn add_seigniorage(&mut self, amount: Amount) -> Result<(), TesseraError> {
        self.keeper.add_seigniorage(self.epoch, amount)
    }

    pub fn add_claim(
        &mut self,
        class: ClaimClass,
        beneficiary: &AccountId,
        weight: Dec,
    ) -> Result<(), TesseraError> {
        self.keeper.add_claim(class, beneficiary, weight)
    }

    /// Record income the caller credits to the treasury account in the same
    /// block.
    pub fn add_income(&mut self, amount: Amount) -> Result<(), TesseraError> {
        self.keeper.add_income(amount)
    }
}

fn process_end_block<S, C>(
    keeper: &mut Keeper<S>,
    height: u64,
    chain: &mut C,
) -> Result<Vec<TreasuryEvent>, TesseraError>
where
    S: KvStore,
    C: ExchangeRateOracle + IssuanceLedger + Bank + ?Sized,
{
    let params = keeper.params()?;
    let clock = EpochClock::from_params(&params)?;
    let epoch = clock.epoch_of(height);
    let mut events = Vec::new();
    let mut settlement = None;

    if clock.is_last_block_of_epoch(height) {
        let issuance = chain.issuance(NATIVE_DENOM, epoch)?;
        keeper.set_issuance_snapshot(epoch, issuance)?;
        debug!(epoch, issuance, "Epoch closed");
    }

    if clock.is_settlement_boundary(height) {
        let issuance = chain.issuance(NATIVE_DENOM, epoch)?;
        if let Some(plan) = keeper.settle(&params, issuance)? {
            events.push(TreasuryEvent::settlement(height, epoch, &plan)?);
            settlement = Some(plan);
        }

        if clock.is_in_probation(epoch) {
            debug!(epoch, "Policy update suspended during probation");
        } else {
            let update = update_policy(keeper, &*chain, &params, epoch)?;
            events.push(TreasuryEvent::policy_update(height, &update));
        }
    }

    keeper.set_last_height(height)?;

    if let Some(plan) = &settlement {
        plan.apply(&treasury_account(), chain)?;
    }
    trace!(height, events = events.len(), "End block");
    Ok(events)
}

/// Open epoch as seen through `keeper`.
fn open_epoch<S: KvStore>(keeper: &Keeper<S>) -> Result<u64, TesseraError> {
    let clock = EpochClock::from_params(&keeper.params()?)?;
    Ok(match keeper.last_height()? {
        Some(last) => clock.epoch_of(last.saturating_add(1)),
        None => 0,
    })
}

fn check_open_epoch<S: KvStore>(keeper: &Keeper<S>, epoch: u64) -> Result<(), TesseraError> {
    let open = open_epoch(keeper)?;
    if epoch != open {
        warn!(epoch, open, "Rejected revenue report outside the open epoch");
        return Err(TesseraError::InvalidInput(format!(
            "revenue for epoch {} reported during epoch {}",
            epoch, open
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::GenesisState;
    use crate::params::PolicyParameters;
    use crate::sim::SimChain;
    use tessera_store::MemStore;

    fn small_params() -> PolicyParameters {
        PolicyParameters {
            blocks_per_epoch: 10,
            settlement_period: 10,
            window_probation: 0,
            target_issuance: 1000,
            ..PolicyParameters::default()
        }
    }

    fn setup(params: PolicyParameters) -> (Treasury<MemStore>, SimChain) {
        let mut treasury = Treasury::new(MemStore::new());
        let genesis = GenesisState {
            params,
            ..GenesisState::default()
        };
        treasury.init_genesis(&genesis).unwrap();
        let mut chain = SimChain::new();
        chain.set_rate("usdr", "1".parse().unwrap());
        chain.mint(&AccountId::new([7; 20]), &Coin::native(1000)).unwrap();
        (treasury, chain)
    }

    #[test]
    fn test_transact_discards_on_error() {
        let (mut treasury, _) = setup(small_params());
        let result: Result<(), TesseraError> = treasury.transact(|keeper| {
            keeper.set_income_pool(55)?;
            Err(TesseraError::InvalidState("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(treasury.view().income_pool().unwrap(), 0);
    }

    #[test]
    fn test_open_epoch_follows_last_height() {
        let (mut treasury, mut chain) = setup(small_params());
        assert_eq!(treasury.open_epoch().unwrap(), 0);
        for h in 0..9 {
            treasury.end_block(h, &mut chain).unwrap();
        }
        assert_eq!(treasury.open_epoch().unwrap(), 0);
        treasury.end_block(9, &mut chain).unwrap();
        assert_eq!(treasury.open_epoch().unwrap(), 1);
    }

    #[test]
    fn test_revenue_outside_open_epoch_rejected() {
        let (mut treasury, _) = setup(small_params());
        assert!(matches!(
            treasury.add_seigniorage(1, 10),
            Err(TesseraError::InvalidInput(_))
        ));
        treasury.add_seigniorage(0, 10).unwrap();
        assert_eq!(treasury.view().seigniorage_pool(0).unwrap(), 10);
    }

    #[test]
    fn test_failed_block_discards_its_inputs() {
        let params = PolicyParameters {
            target_issuance: 5000,
            ..small_params()
        };
        let (mut treasury, mut chain) = setup(params);
        let beneficiary = AccountId::new([1; 20]);
        fn deliver(
            inputs: &mut BlockInputs<'_, CacheStore<'_, MemStore>>,
            chain: &mut SimChain,
        ) -> Result<(), TesseraError> {
            assert_eq!(inputs.epoch(), 0);
            chain.mint(&treasury_account(), &Coin::native(100))?;
            inputs.add_income(100)?;
            inputs.add_claim(ClaimClass::Budget, &AccountId::new([1; 20]), Dec::one())?;
            inputs.record_tax_proceeds(&Coins::from_coins(&[Coin::new("usdr", 100)?])?)?;
            inputs.add_seigniorage(50)
        }

        // The income mint succeeds, the settlement mint is refused.
        let snapshot = chain.clone();
        chain.fail_mints_after(1);
        let err = treasury.execute_block(9, &mut chain, deliver).unwrap_err();
        assert!(matches!(err, TesseraError::Collaborator(_)));
        let view = treasury.view();
        assert!(view.tax_proceeds(0).unwrap().is_empty());
        assert_eq!(view.seigniorage_pool(0).unwrap(), 0);
        assert_eq!(view.income_pool().unwrap(), 0);
        assert!(view.claims().unwrap().is_empty());
        assert_eq!(view.last_height().unwrap(), None);

        chain = snapshot;
        let events = treasury.execute_block(9, &mut chain, deliver).unwrap();
        assert!(!events.is_empty());
        let view = treasury.view();
        assert_eq!(view.tax_proceeds(0).unwrap().amount_of("usdr"), 100);
        assert_eq!(view.seigniorage_pool(0).unwrap(), 50);
        assert_eq!(chain.balance(&beneficiary, "utes"), 3600);

        // A processed height does not take inputs again.
        treasury.execute_block(9, &mut chain, deliver).unwrap();
        assert_eq!(treasury.view().seigniorage_pool(0).unwrap(), 50);
    }

    #[test]
    fn test_issuance_snapshot_on_last_block() {
        let (mut treasury, mut chain) = setup(small_params());
        treasury.end_block(8, &mut chain).unwrap();
        assert_eq!(treasury.view().issuance_snapshot(0).unwrap(), None);
        treasury.end_block(9, &mut chain).unwrap();
        assert_eq!(treasury.view().issuance_snapshot(0).unwrap(), Some(1000));
    }

    #[test]
    fn test_request_funds() {
        let (treasury, mut chain) = setup(small_params());
        let requester = AccountId::new([4; 20]);
        treasury
            .request_funds(&mut chain, &requester, &Coin::native(25))
            .unwrap();
        assert_eq!(chain.balance(&requester, "utes"), 25);
        assert!(matches!(
            treasury.request_funds(&mut chain, &requester, &Coin::native(0)),
            Err(TesseraError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_add_income_zero_is_noop() {
        let (mut treasury, _) = setup(small_params());
        treasury.add_income(0).unwrap();
        treasury.add_income(40).unwrap();
        treasury.add_income(2).unwrap();
        assert_eq!(treasury.view().income_pool().unwrap(), 42);
    }

    #[test]
    fn test_end_block_requires_genesis() {
        let mut treasury = Treasury::new(MemStore::new());
        let mut chain = SimChain::new();
        assert!(matches!(
            treasury.end_block(0, &mut chain),
            Err(TesseraError::InvalidState(_))
        ));
    }
}
