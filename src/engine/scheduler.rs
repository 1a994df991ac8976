//! Fixed-rate tick loop
//!
//! Runs on the current-thread runtime. Missed ticks are skipped rather than
//! bursted. The engine is handed the actual time of each tick, not its
//! scheduled deadline, so a stall is credited in full.

use std::time::Instant;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{Engine, EngineError, Running};

/// Ticks the engine at its poll rate until `cancel` fires
pub async fn run(engine: &mut Engine<Running>, cancel: CancellationToken) -> Result<(), EngineError> {
    let period = engine.poll_period();
    info!("Polling every {:?}", period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Shutdown requested, leaving cursor and windows as they are");
                break;
            }

            _ = ticker.tick() => {
                engine.tick(Instant::now())?;
            }
        }
    }

    Ok(())
}

/// Cancels `cancel` on Ctrl-C
pub fn cancel_on_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received");
                cancel.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    })
}
