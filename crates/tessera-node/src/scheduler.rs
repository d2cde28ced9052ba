// crates/tessera-node/src/scheduler.rs
//
// Block scheduler for the Tessera node.
//
// Produces blocks at a fixed interval until the configured count is reached
// or a shutdown signal arrives, logging epoch transitions on the way.

use std::time::Duration;

use tessera_core::error::TesseraError;
use tessera_core::traits::KvStore;
use tessera_treasury::TreasuryEvent;

use crate::host::Host;

/// Scheduler that drives a [`Host`] one block at a time.
pub struct BlockScheduler {
    /// Delay between blocks.
    interval: Duration,
    /// Number of blocks to produce in this run.
    blocks: u64,
}

impl BlockScheduler {
    pub fn new(interval: Duration, blocks: u64) -> Self {
        Self { interval, blocks }
    }

    /// Run the block loop, handing each block's events to `on_events`.
    ///
    /// Returns the number of blocks produced. A failed block stops the loop
    /// and returns its error.
    pub async fn run<S, F>(&self, host: &mut Host<S>, mut on_events: F) -> Result<u64, TesseraError>
    where
        S: KvStore,
        F: FnMut(u64, &[TreasuryEvent]),
    {
        tracing::info!(
            "Block scheduler started (blocks={}, interval={:?}, from height {})",
            self.blocks,
            self.interval,
            host.next_height()
        );

        let mut produced = 0;
        while produced < self.blocks {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Block scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    let height = host.next_height();
                    let events = host.step()?;
                    produced += 1;
                    on_events(height, &events);
                    log_progress(host, height)?;
                }
            }
        }

        Ok(produced)
    }
}

fn log_progress<S: KvStore>(host: &Host<S>, height: u64) -> Result<(), TesseraError> {
    let clock = host.treasury().clock()?;
    let epoch = clock.epoch_of(height);
    if clock.is_last_block_of_epoch(height) {
        tracing::info!("=== EPOCH {} CLOSED === (block {})", epoch, height);
    } else {
        tracing::trace!("Block {} (epoch {})", height, epoch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use tessera_store::MemStore;
    use tessera_treasury::default_genesis;

    #[tokio::test]
    async fn test_runs_requested_block_count() {
        let config = NodeConfig {
            blocks_per_epoch: 5,
            ..NodeConfig::default()
        };
        let mut genesis = default_genesis();
        genesis.params.blocks_per_epoch = 5;
        genesis.params.settlement_period = 5;
        let mut host = Host::open(MemStore::new(), config, &genesis).unwrap();

        let scheduler = BlockScheduler::new(Duration::ZERO, 12);
        let mut heights = Vec::new();
        let mut event_count = 0;
        let produced = scheduler
            .run(&mut host, |height, events| {
                heights.push(height);
                event_count += events.len();
            })
            .await
            .unwrap();

        assert_eq!(produced, 12);
        assert_eq!(host.next_height(), 12);
        assert_eq!(heights, (0..12).collect::<Vec<u64>>());
        // Two settlements, and no policy updates inside the default probation.
        assert_eq!(event_count, 2);
    }
}
