// crates/tessera-treasury/src/querier.rs
//
// Read-only typed queries over committed treasury state. Historical
// queries return what was stored for that epoch; nothing is recomputed
// except the indicators, which are derived from stored history.

use serde::{Deserialize, Serialize};

use tessera_core::coin::{Amount, Coins};
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::{ExchangeRateOracle, IssuanceLedger, KvStore};

use crate::claims::Claim;
use crate::end_blocker::Treasury;
use crate::indicator::{IndicatorEngine, Indicators};
use crate::params::PolicyParameters;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreasuryQuery {
    TaxRate { epoch: u64 },
    RewardWeight { epoch: u64 },
    TaxCap { denom: String },
    Params,
    IncomePool,
    TaxProceeds { epoch: u64 },
    SeigniorageProceeds { epoch: u64 },
    Issuance { epoch: u64 },
    Indicators { epoch: u64 },
    Claims,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResponse {
    TaxRate(Dec),
    RewardWeight(Dec),
    TaxCap(Amount),
    Params(PolicyParameters),
    IncomePool(Amount),
    TaxProceeds(Coins),
    SeigniorageProceeds(Amount),
    Issuance(Amount),
    Indicators(Indicators),
    Claims(Vec<Claim>),
}

impl<S: KvStore> Treasury<S> {
    /// Answer `query`. `chain` supplies exchange rates and issuance for
    /// epochs without a stored snapshot.
    pub fn query<C>(&self, chain: &C, query: &TreasuryQuery) -> Result<QueryResponse, TesseraError>
    where
        C: ExchangeRateOracle + IssuanceLedger + ?Sized,
    {
        let keeper = self.view();
        let response = match query {
            TreasuryQuery::TaxRate { epoch } => QueryResponse::TaxRate(keeper.tax_rate(*epoch)?),
            TreasuryQuery::RewardWeight { epoch } => {
                QueryResponse::RewardWeight(keeper.reward_weight(*epoch)?)
            }
            TreasuryQuery::TaxCap { denom } => QueryResponse::TaxCap(keeper.tax_cap(denom)?),
            TreasuryQuery::Params => QueryResponse::Params(keeper.params()?),
            TreasuryQuery::IncomePool => QueryResponse::IncomePool(keeper.income_pool()?),
            TreasuryQuery::TaxProceeds { epoch } => {
                QueryResponse::TaxProceeds(keeper.tax_proceeds(*epoch)?)
            }
            TreasuryQuery::SeigniorageProceeds { epoch } => {
                QueryResponse::SeigniorageProceeds(keeper.seigniorage_pool(*epoch)?)
            }
            TreasuryQuery::Issuance { epoch } => {
                QueryResponse::Issuance(IndicatorEngine::new(&keeper, chain).issuance(*epoch)?)
            }
            TreasuryQuery::Indicators { epoch } => {
                let params = keeper.params()?;
                QueryResponse::Indicators(IndicatorEngine::new(&keeper, chain).snapshot(*epoch, &params)?)
            }
            TreasuryQuery::Claims => QueryResponse::Claims(keeper.claims()?),
        };
        Ok(response)
    }
}
