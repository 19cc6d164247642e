// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route watch driver.
//!
//! Keeps a watch session over all routes open and feeds its events to the
//! [`Dispatcher`]. The driver is an explicit state machine:
//!
//! ```text
//! Connecting --open ok--> Connected --channel closed--> Reconnecting
//!     |  ^                    |                              |
//!     |  +------delay---------+------------------------------+
//!     +--open failed--> Reconnecting
//!
//! any state --shutdown--> Stopped
//! ```
//!
//! Reconnect attempts never give up; each waits the [`ReconnectPolicy`]
//! delay. On stop the dispatcher is drained so in-flight work can finish.

use crate::cluster::{ClusterApi, RouteEvent};
use crate::dispatch::Dispatcher;
use crate::metrics;
use crate::reconcilers::Reconciler;
use crate::retry::ReconnectPolicy;
use crate::shutdown;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// State of the watch driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    /// Opening a watch session
    Connecting,
    /// Session open, dispatching events
    Connected,
    /// Waiting before the next open
    Reconnecting,
    /// Shut down
    Stopped,
}

/// Drives the route watch and dispatches its events.
pub struct WatchDriver {
    cluster: Arc<dyn ClusterApi>,
    dispatcher: Dispatcher,
    policy: ReconnectPolicy,
    drain_timeout: Duration,
    state: watch::Sender<WatchState>,
}

impl std::fmt::Debug for WatchDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchDriver")
            .field("state", &*self.state.borrow())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl WatchDriver {
    /// Create a driver in the `Connecting` state.
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        reconciler: Reconciler,
        policy: ReconnectPolicy,
        drain_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(WatchState::Connecting);
        Self {
            cluster,
            dispatcher: Dispatcher::new(reconciler),
            policy,
            drain_timeout,
            state,
        }
    }

    /// Observe state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    fn transition(&self, next: WatchState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "Watch state changed");
        }
    }

    /// Run until shutdown is requested.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        info!("Starting route watch");

        loop {
            let current = *self.state.borrow();
            let next = match current {
                WatchState::Connecting => self.connect(&mut stop).await,
                WatchState::Reconnecting => self.wait_to_reconnect(&mut stop).await,
                WatchState::Connected | WatchState::Stopped => break,
            };
            self.transition(next);
        }

        self.transition(WatchState::Stopped);
        if !self.dispatcher.drain(self.drain_timeout).await {
            warn!("Route watch stopped with unfinished work");
        }
        info!("Route watch stopped");
    }

    async fn connect(&mut self, stop: &mut watch::Receiver<bool>) -> WatchState {
        let opened = tokio::select! {
            biased;
            () = shutdown::requested(stop) => return WatchState::Stopped,
            opened = self.cluster.watch_routes() => opened,
        };

        match opened {
            Ok(events) => {
                self.policy.reset();
                self.transition(WatchState::Connected);
                info!("Route watch connected");
                self.consume(events, stop).await
            }
            Err(e) => {
                warn!(
                    error = %e,
                    attempt = self.policy.attempts() + 1,
                    "Failed to open route watch"
                );
                metrics::record_error(e.reason());
                WatchState::Reconnecting
            }
        }
    }

    async fn consume(
        &mut self,
        mut events: mpsc::Receiver<RouteEvent>,
        stop: &mut watch::Receiver<bool>,
    ) -> WatchState {
        loop {
            let event = tokio::select! {
                biased;
                () = shutdown::requested(stop) => return WatchState::Stopped,
                event = events.recv() => event,
            };

            match event {
                Some(event) => self.dispatcher.dispatch(event),
                None => {
                    warn!("Route watch closed");
                    return WatchState::Reconnecting;
                }
            }
        }
    }

    async fn wait_to_reconnect(&mut self, stop: &mut watch::Receiver<bool>) -> WatchState {
        let delay = self.policy.next_backoff();
        metrics::record_watch_reconnect();
        info!(
            delay = ?delay,
            attempt = self.policy.attempts(),
            "Reconnecting route watch"
        );

        tokio::select! {
            biased;
            () = shutdown::requested(stop) => WatchState::Stopped,
            () = tokio::time::sleep(delay) => WatchState::Connecting,
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod watcher_tests;
