// crates/tessera-node/src/config.rs
//
// Runtime configuration for the Tessera node.
// Loaded from a TOML file or populated with defaults. Amounts are u64 here
// because TOML integers are 64-bit; they widen to `Amount` on use.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

use tessera_core::coin::{validate_denom, NATIVE_DENOM};
use tessera_core::dec::Dec;
use tessera_treasury::{ClaimClass, MAX_EPOCH_REVENUE};

/// A claim submitted at the start of every epoch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClaimConfig {
    pub class: ClaimClass,
    /// Label the beneficiary account is derived from.
    pub beneficiary: String,
    pub weight: Dec,
}

/// Runtime configuration for the node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeConfig {
    /// Number of blocks to produce before exiting.
    #[serde(default = "default_blocks")]
    pub blocks: u64,

    /// Delay between blocks in milliseconds. Zero runs as fast as possible.
    #[serde(default)]
    pub block_interval_ms: u64,

    /// Log level used when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// RocksDB directory. In-memory store when absent.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Path to a JSON genesis file. Default genesis when absent.
    #[serde(default)]
    pub genesis: Option<String>,

    /// Epoch length applied to the default genesis.
    #[serde(default = "default_blocks_per_epoch")]
    pub blocks_per_epoch: u64,

    /// Probation applied to the default genesis.
    #[serde(default = "default_window_probation")]
    pub window_probation: u64,

    /// Native supply minted to a reserve account before the first block.
    /// Defaults to just under the default issuance target.
    #[serde(default = "default_initial_issuance")]
    pub initial_issuance: u64,

    /// Native-unit price of each non-native denom.
    #[serde(default = "default_exchange_rates")]
    pub exchange_rates: BTreeMap<String, Dec>,

    /// Tax collected per block, by denom.
    #[serde(default = "default_tax_per_block")]
    pub tax_per_block: BTreeMap<String, u64>,

    /// Native seigniorage collected per block.
    #[serde(default = "default_seigniorage_per_block")]
    pub seigniorage_per_block: u64,

    /// Native income credited to the treasury at the start of each epoch.
    #[serde(default = "default_income_per_epoch")]
    pub income_per_epoch: u64,

    #[serde(default = "default_claims")]
    pub claims: Vec<ClaimConfig>,
}

fn default_blocks() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_blocks_per_epoch() -> u64 {
    100
}

fn default_window_probation() -> u64 {
    2
}

fn default_initial_issuance() -> u64 {
    999_000_000_000_000
}

fn default_exchange_rates() -> BTreeMap<String, Dec> {
    let mut rates = BTreeMap::new();
    rates.insert("usdr".to_string(), Dec::with_prec(25, 1));
    rates.insert("ukrw".to_string(), Dec::with_prec(2, 3));
    rates
}

fn default_tax_per_block() -> BTreeMap<String, u64> {
    let mut tax = BTreeMap::new();
    tax.insert("usdr".to_string(), 40_000_000);
    tax.insert("ukrw".to_string(), 25_000_000_000);
    tax
}

fn default_seigniorage_per_block() -> u64 {
    60_000_000
}

fn default_income_per_epoch() -> u64 {
    10_000_000_000
}

fn default_claims() -> Vec<ClaimConfig> {
    vec![
        ClaimConfig {
            class: ClaimClass::Oracle,
            beneficiary: "oracle-feeder-1".to_string(),
            weight: Dec::from_int(3),
        },
        ClaimConfig {
            class: ClaimClass::Oracle,
            beneficiary: "oracle-feeder-2".to_string(),
            weight: Dec::from_int(1),
        },
        ClaimConfig {
            class: ClaimClass::Budget,
            beneficiary: "community-program".to_string(),
            weight: Dec::from_int(1),
        },
    ]
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            blocks: default_blocks(),
            block_interval_ms: 0,
            log_level: default_log_level(),
            data_dir: None,
            genesis: None,
            blocks_per_epoch: default_blocks_per_epoch(),
            window_probation: default_window_probation(),
            initial_issuance: default_initial_issuance(),
            exchange_rates: default_exchange_rates(),
            tax_per_block: default_tax_per_block(),
            seigniorage_per_block: default_seigniorage_per_block(),
            income_per_epoch: default_income_per_epoch(),
            claims: default_claims(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Reject settings the simulation cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.blocks_per_epoch == 0 {
            return Err("blocks_per_epoch must be positive".to_string());
        }
        for (denom, rate) in &self.exchange_rates {
            validate_denom(denom).map_err(|e| e.to_string())?;
            if !rate.is_positive() {
                return Err(format!("exchange rate for {} must be positive", denom));
            }
        }
        for denom in self.tax_per_block.keys() {
            validate_denom(denom).map_err(|e| e.to_string())?;
            if denom == NATIVE_DENOM {
                return Err(format!("{} is tax-exempt", NATIVE_DENOM));
            }
        }
        let per_block = self
            .tax_per_block
            .iter()
            .map(|(denom, amount)| (denom.as_str(), *amount))
            .chain(std::iter::once((NATIVE_DENOM, self.seigniorage_per_block)));
        for (denom, amount) in per_block {
            let per_epoch = u128::from(amount) * u128::from(self.blocks_per_epoch);
            if per_epoch > MAX_EPOCH_REVENUE {
                return Err(format!(
                    "{} revenue of {} per epoch exceeds the limit {}",
                    denom, per_epoch, MAX_EPOCH_REVENUE
                ));
            }
        }
        for claim in &self.claims {
            if claim.weight.is_negative() {
                return Err(format!("claim weight for {} is negative", claim.beneficiary));
            }
        }
        Ok(())
    }
}
