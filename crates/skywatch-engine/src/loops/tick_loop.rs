//! Periodic detection tick driver.
//!
//! A single driver triggers one full pass per interval. A pass that
//! overruns its interval causes the next tick to be skipped rather than
//! overlapped, so two passes never run concurrently. Shutdown is observed
//! only between passes: an in-flight tick always finishes its pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::engine::Engine;

/// Start the detection loop. Returns when the shutdown signal fires.
pub async fn run_tick_loop(engine: Arc<Engine>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(engine.config().tick_interval.max(Duration::from_millis(10)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("tick loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                engine.run_tick().await;
            }
        }
    }
}
