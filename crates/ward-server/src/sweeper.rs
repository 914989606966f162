//! Background escalation and schedule-extension sweep.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};
use ward_engine::SharedWardEngine;

/// Runs [`WardEngine::sweep_once`](ward_engine::WardEngine::sweep_once) on a
/// fixed interval.
pub struct Sweeper {
    engine: SharedWardEngine,
    interval: Duration,
}

impl Sweeper {
    pub fn new(engine: SharedWardEngine, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Sweep until `shutdown` flips to true.
    ///
    /// A slow pass delays the next tick instead of queueing a burst.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = self.interval.as_secs(), "Sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let now = self.engine.now();
            match self.engine.sweep_once(now).await {
                Ok(report) => {
                    if report.escalated + report.failed + report.administrations_created > 0 {
                        info!(
                            escalated = report.escalated,
                            skipped = report.skipped,
                            failed = report.failed,
                            administrations_created = report.administrations_created,
                            "Sweep completed"
                        );
                    } else {
                        debug!(skipped = report.skipped, "Sweep found nothing to do");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Sweep failed");
                }
            }
        }

        info!("Sweeper stopped");
    }
}
