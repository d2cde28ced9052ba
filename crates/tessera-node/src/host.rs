// crates/tessera-node/src/host.rs
//
// The host around the treasury: feeds simulated revenue, income, and claims
// into the engine together with the end blocker for each height, and rolls
// the simulated chain back when a block fails. A failed block leaves no
// trace, so retrying it counts its inputs once.

use tracing::{debug, error, info, warn};

use tessera_core::account::AccountId;
use tessera_core::coin::{Amount, Coin, Coins, REFERENCE_DENOM};
use tessera_core::error::TesseraError;
use tessera_core::traits::{Bank, KvStore};
use tessera_store::state_digest_hex;
use tessera_treasury::{
    treasury_account, BlockInputs, GenesisState, QueryResponse, SimChain, Treasury, TreasuryEvent,
    TreasuryQuery,
};

use crate::config::NodeConfig;

/// Account holding the initial native supply.
pub fn reserve_account() -> AccountId {
    AccountId::module("reserve")
}

/// Treasury engine, simulated chain, and the next height to produce.
pub struct Host<S: KvStore> {
    treasury: Treasury<S>,
    chain: SimChain,
    config: NodeConfig,
    next_height: u64,
}

impl<S: KvStore> Host<S> {
    /// Apply `genesis` to an empty store, or resume after the last height
    /// a previous run committed.
    ///
    /// The simulated chain is not persisted; on resume its balances restart
    /// from the initial issuance plus the stored income pool.
    pub fn open(store: S, config: NodeConfig, genesis: &GenesisState) -> Result<Self, TesseraError> {
        let mut treasury = Treasury::new(store);
        let mut chain = SimChain::new();
        for (denom, rate) in &config.exchange_rates {
            chain.set_rate(denom, *rate);
        }
        if config.initial_issuance > 0 {
            chain.mint(
                &reserve_account(),
                &Coin::native(Amount::from(config.initial_issuance)),
            )?;
        }

        if treasury.view().has_params()? {
            warn!("Resuming existing treasury state; simulated balances restart");
        } else {
            treasury.init_genesis(genesis)?;
        }

        let income_pool = treasury.view().income_pool()?;
        if income_pool > 0 {
            chain.mint(&treasury_account(), &Coin::native(income_pool))?;
        }

        let next_height = match treasury.view().last_height()? {
            Some(last) => last
                .checked_add(1)
                .ok_or_else(|| TesseraError::overflow("block height"))?,
            None => 0,
        };
        chain.advance_epoch(treasury.clock()?.epoch_of(next_height));
        info!(next_height, "Treasury host ready");

        Ok(Self {
            treasury,
            chain,
            config,
            next_height,
        })
    }

    pub fn next_height(&self) -> u64 {
        self.next_height
    }

    pub fn treasury(&self) -> &Treasury<S> {
        &self.treasury
    }

    pub fn chain(&self) -> &SimChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut SimChain {
        &mut self.chain
    }

    /// Produce one block.
    ///
    /// The block's inputs and its end commit together. On error the
    /// simulated chain is restored to its state before the block and the
    /// height is not advanced.
    pub fn step(&mut self) -> Result<Vec<TreasuryEvent>, TesseraError> {
        let height = self.next_height;
        let clock = self.treasury.clock()?;
        let opens_epoch = height % clock.blocks_per_epoch() == 0;
        let config = &self.config;

        let snapshot = self.chain.clone();
        let result = self.treasury.execute_block(height, &mut self.chain, |inputs, chain| {
            if opens_epoch {
                begin_epoch(config, inputs, chain)?;
            }
            collect_revenue(config, inputs)
        });
        match result {
            Ok(events) => {
                self.next_height = height
                    .checked_add(1)
                    .ok_or_else(|| TesseraError::overflow("block height"))?;
                self.chain.advance_epoch(clock.epoch_of(self.next_height));
                Ok(events)
            }
            Err(e) => {
                self.chain = snapshot;
                error!(height, error = %e, "Block failed, chain rolled back");
                Err(e)
            }
        }
    }

    /// Queries describing the state after the last produced block.
    pub fn summary(&self) -> Result<Vec<(&'static str, QueryResponse)>, TesseraError> {
        let clock = self.treasury.clock()?;
        let open = clock.epoch_of(self.next_height);
        let mut queries = vec![
            ("tax_rate", TreasuryQuery::TaxRate { epoch: open }),
            ("reward_weight", TreasuryQuery::RewardWeight { epoch: open }),
            (
                "tax_cap",
                TreasuryQuery::TaxCap {
                    denom: REFERENCE_DENOM.to_string(),
                },
            ),
            ("income_pool", TreasuryQuery::IncomePool),
            ("claims", TreasuryQuery::Claims),
        ];
        if let Some(closed) = open.checked_sub(1) {
            queries.push(("issuance", TreasuryQuery::Issuance { epoch: closed }));
            queries.push(("indicators", TreasuryQuery::Indicators { epoch: closed }));
        }
        let mut summary = Vec::with_capacity(queries.len());
        for (name, query) in queries {
            summary.push((name, self.treasury.query(&self.chain, &query)?));
        }
        Ok(summary)
    }

    /// Hex digest of the committed treasury state.
    pub fn digest_hex(&self) -> Result<String, TesseraError> {
        state_digest_hex(self.treasury.store())
    }
}

/// Credit the epoch's income to the treasury and submit the configured claims.
fn begin_epoch<S: KvStore>(
    config: &NodeConfig,
    inputs: &mut BlockInputs<'_, S>,
    chain: &mut SimChain,
) -> Result<(), TesseraError> {
    let income = Amount::from(config.income_per_epoch);
    if income > 0 {
        chain.mint(&treasury_account(), &Coin::native(income))?;
        inputs.add_income(income)?;
    }
    for claim in &config.claims {
        let beneficiary = AccountId::module(&claim.beneficiary);
        inputs.add_claim(claim.class, &beneficiary, claim.weight)?;
    }
    debug!(epoch = inputs.epoch(), income, claims = config.claims.len(), "Epoch opened");
    Ok(())
}

fn collect_revenue<S: KvStore>(
    config: &NodeConfig,
    inputs: &mut BlockInputs<'_, S>,
) -> Result<(), TesseraError> {
    let mut tax = Coins::new();
    for (denom, amount) in &config.tax_per_block {
        tax.add(&Coin::new(denom.as_str(), Amount::from(*amount))?)?;
    }
    if !tax.is_empty() {
        inputs.record_tax_proceeds(&tax)?;
    }
    inputs.add_seigniorage(Amount::from(config.seigniorage_per_block))
}
