// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconnect policy for the route watch.
//!
//! A closed or unopenable watch is retried after a fixed delay, forever.
//! The policy only computes delays and counts attempts; the watch driver
//! does the sleeping, so the policy can be tested without a clock.

use std::time::Duration;

/// Fixed-delay reconnect policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before every reconnect attempt
    pub delay: Duration,
    /// Consecutive reconnect attempts since the last successful open
    attempts: u32,
}

impl ReconnectPolicy {
    /// Create a policy that always waits `delay`.
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self { delay, attempts: 0 }
    }

    /// Delay before the next reconnect attempt.
    ///
    /// Counts the attempt. Never gives up.
    pub fn next_backoff(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        self.delay
    }

    /// Forget previous attempts after a successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Consecutive attempts since the last reset.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
