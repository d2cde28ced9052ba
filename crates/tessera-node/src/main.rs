// crates/tessera-node/src/main.rs
//
// Binary entrypoint for the Tessera node.
//
// Initializes tracing, parses CLI arguments, loads configuration and
// genesis, opens the store, and drives the treasury engine block by block
// against the simulated chain. Events are printed as JSON lines, followed
// by a query summary of the final state.

mod config;
mod host;
mod scheduler;
mod state;

use std::time::Duration;

use clap::Parser;
use config::NodeConfig;
use host::Host;
use scheduler::BlockScheduler;
use state::{NodeState, NodeStateMachine};

use tessera_core::traits::KvStore;
use tessera_store::{MemStore, RocksStore};
use tessera_treasury::{default_genesis, GenesisState};

/// Tessera node: runs the treasury engine over a simulated chain.
#[derive(Parser, Debug)]
#[command(name = "tessera-node", version = "0.1.0", about = "Tessera treasury node")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "tessera.toml")]
    config: String,

    /// Number of blocks to produce (overrides the config file).
    #[arg(long)]
    blocks: Option<u64>,

    /// RocksDB directory (overrides the config file).
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The log level may come from the config file, so load it before
    // installing the subscriber and report the outcome afterwards.
    let loaded = NodeConfig::load(&args.config);
    let mut node_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => NodeConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&node_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", args.config),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            args.config,
            e
        ),
    }

    if let Some(blocks) = args.blocks {
        node_config.blocks = blocks;
    }
    if args.data_dir.is_some() {
        node_config.data_dir = args.data_dir.clone();
    }
    node_config.validate()?;

    let genesis = load_genesis(&node_config)?;

    tracing::info!("Tessera node v0.1.0");
    tracing::info!("Blocks to produce: {}", node_config.blocks);
    tracing::info!("Blocks per epoch: {}", genesis.params.blocks_per_epoch);

    match node_config.data_dir.clone() {
        Some(dir) => {
            let store = RocksStore::open(&dir)?;
            tracing::info!("RocksDB store opened at {}", dir);
            run(store, node_config, &genesis).await
        }
        None => {
            tracing::info!("Using in-memory store");
            run(MemStore::new(), node_config, &genesis).await
        }
    }
}

/// Genesis from the configured JSON file, or the default genesis with the
/// config's epoch length and probation applied.
fn load_genesis(config: &NodeConfig) -> Result<GenesisState, Box<dyn std::error::Error>> {
    match &config.genesis {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            let genesis: GenesisState = serde_json::from_str(&contents)?;
            tracing::info!("Loaded genesis from {}", path);
            Ok(genesis)
        }
        None => {
            let mut genesis = default_genesis();
            genesis.params.blocks_per_epoch = config.blocks_per_epoch;
            genesis.params.settlement_period = config.blocks_per_epoch;
            genesis.params.window_probation = config.window_probation;
            Ok(genesis)
        }
    }
}

async fn run<S: KvStore>(
    store: S,
    config: NodeConfig,
    genesis: &GenesisState,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state_machine = NodeStateMachine::new();
    let scheduler = BlockScheduler::new(Duration::from_millis(config.block_interval_ms), config.blocks);
    let mut host = Host::open(store, config, genesis)?;
    state_machine.transition(NodeState::Running)?;

    let result = scheduler
        .run(&mut host, |_, events| {
            for event in events {
                match serde_json::to_string(event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Could not encode event: {}", e),
                }
            }
        })
        .await;

    match &result {
        Ok(produced) => tracing::info!("Produced {} blocks", produced),
        Err(e) => {
            state_machine.transition(NodeState::Halted)?;
            tracing::error!("Node halted: {}", e);
        }
    }

    for (name, response) in host.summary()? {
        println!("{}: {}", name, serde_json::to_string(&response)?);
    }
    println!("state_digest: {}", host.digest_hex()?);

    let _ = state_machine.transition(NodeState::ShuttingDown);
    tracing::info!("Tessera node shut down");

    result.map(|_| ()).map_err(Into::into)
}
