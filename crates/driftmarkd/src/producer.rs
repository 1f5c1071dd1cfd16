//! The value producer.
//!
//! Stands in for whatever subsystem generates state worth
//! checkpointing: it emits a monotonically increasing sequence number
//! at a random cadence. Values travel by move over the bounded channel,
//! so the scheduler's copy can never be mutated behind its back, and a
//! full channel blocks the producer until the scheduler catches up.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// The value the daemon persists: a monotonically increasing sequence
/// number, one per generated update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub seq: u64,
}

/// Emit `Checkpoint` values until the shutdown signal flips.
///
/// Each send is preceded by a uniformly random delay below
/// `max_interval`. Returning drops the sender, which closes the channel
/// and lets the scheduler drain.
pub async fn produce(
    tx: mpsc::Sender<Checkpoint>,
    max_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut rng = StdRng::from_entropy();
    let max_ms = (max_interval.as_millis() as u64).max(1);

    for seq in 0u64.. {
        let wait = Duration::from_millis(rng.gen_range(0..max_ms));
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => {
                info!(produced = seq, "producer stopping");
                return;
            }
        }
        if tx.send(Checkpoint { seq }).await.is_err() {
            debug!(seq, "channel closed under the producer");
            return;
        }
    }
}
