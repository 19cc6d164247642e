// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Periodic sweep driver.
//!
//! Runs [`Reconciler::sweep`] every interval. The first sweep happens one
//! interval after start; the watch's initial listing covers startup. A sweep
//! that overruns the interval delays the next tick instead of bursting.

use crate::reconcilers::Reconciler;
use crate::shutdown;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

/// Triggers a sweep over tracked routes at a fixed interval.
#[derive(Debug)]
pub struct TickerDriver {
    reconciler: Reconciler,
    interval: Duration,
}

impl TickerDriver {
    /// Create a driver sweeping every `interval`.
    #[must_use]
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
        }
    }

    /// Run until shutdown is requested. Returns the number of sweeps run.
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> u64 {
        info!(interval = ?self.interval, "Starting periodic sweep");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweeps = 0;

        loop {
            tokio::select! {
                biased;
                () = shutdown::requested(&mut stop) => break,
                _ = ticker.tick() => {
                    self.reconciler.sweep().await;
                    sweeps += 1;
                }
            }
        }

        info!(sweeps, "Periodic sweep stopped");
        sweeps
    }
}

#[cfg(test)]
#[path = "ticker_tests.rs"]
mod ticker_tests;
