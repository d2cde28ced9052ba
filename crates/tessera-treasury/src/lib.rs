// crates/tessera-treasury/src/lib.rs
//
// tessera-treasury: The stabilization engine of the Tessera chain.
//
// Each epoch the treasury observes stability-tax and seigniorage revenue,
// derives per-unit indicators over rolling windows, retunes the tax rate
// and reward weight within clamped bounds, and settles weighted claims
// against its income while steering native issuance toward a target.
//
// Every result must be bit-identical on every node: decimal arithmetic is
// fixed-point, iteration is in key order, and each state transition commits
// atomically or not at all.

pub mod claims;
pub mod end_blocker;
pub mod epoch;
pub mod events;
pub mod genesis;
pub mod gov;
pub mod indicator;
pub mod keeper;
pub mod params;
pub mod policy;
pub mod querier;
pub mod revenue;
pub mod settlement;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use claims::{Claim, ClaimClass};
pub use end_blocker::{BlockInputs, Treasury};
pub use epoch::EpochClock;
pub use events::TreasuryEvent;
pub use genesis::{default_genesis, GenesisState};
pub use gov::{ParamsUpdateProposal, RewardWeightUpdateProposal, TaxRateUpdateProposal};
pub use indicator::{rolling_average, IndicatorEngine, Indicators};
pub use keeper::Keeper;
pub use params::{PolicyConstraints, PolicyParameters};
pub use policy::{update_policy, PolicyController, PolicyUpdate};
pub use querier::{QueryResponse, TreasuryQuery};
pub use revenue::MAX_EPOCH_REVENUE;
pub use settlement::{plan_settlement, treasury_account, Payout, SettlementPlan, TREASURY_MODULE};
#[cfg(any(test, feature = "sim"))]
pub use sim::SimChain;
