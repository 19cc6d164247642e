// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-route event dispatch.
//!
//! A route key with pending events gets its own queue and worker task. Events
//! for one key are handled strictly in arrival order; different keys proceed
//! in parallel.
//!
//! A worker exits once its queue runs empty, or after handling a deletion.
//! An idle worker closes its queue before it leaves, so the dispatcher's next
//! send fails and starts a fresh worker instead. The dispatcher also forgets
//! a key's queue as soon as it enqueues a deletion. Either way the fresh
//! worker first waits for its predecessor to finish, keeping per-key order
//! across the handover.

use crate::cluster::RouteEvent;
use crate::crd::RouteKey;
use crate::metrics;
use crate::reconcilers::{Reconciler, Trigger};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

struct Lane {
    tx: mpsc::UnboundedSender<RouteEvent>,
    done: oneshot::Receiver<()>,
}

/// Routes watch events to per-key workers.
pub struct Dispatcher {
    reconciler: Reconciler,
    lanes: HashMap<RouteKey, Lane>,
    retiring: HashMap<RouteKey, oneshot::Receiver<()>>,
    workers: JoinSet<RouteKey>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("lanes", &self.lanes.len())
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher with no workers.
    #[must_use]
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            lanes: HashMap::new(),
            retiring: HashMap::new(),
            workers: JoinSet::new(),
        }
    }

    /// Queue an event on its route's worker, starting one if needed.
    pub fn dispatch(&mut self, event: RouteEvent) {
        self.reap();

        let key = match event.route().key() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Ignoring route event without identity");
                metrics::record_error(e.reason());
                return;
            }
        };
        let deleted = matches!(event, RouteEvent::Deleted(_));

        let event = match self.lanes.remove(&key) {
            Some(lane) => match lane.tx.send(event) {
                Ok(()) => {
                    self.lanes.insert(key.clone(), lane);
                    None
                }
                Err(mpsc::error::SendError(event)) => {
                    self.retiring.insert(key.clone(), lane.done);
                    Some(event)
                }
            },
            None => Some(event),
        };

        if let Some(event) = event {
            let lane = self.start_worker(key.clone());
            if lane.tx.send(event).is_err() {
                error!(route = %key, "Route worker exited before its first event");
            }
            self.lanes.insert(key.clone(), lane);
        }

        if deleted {
            if let Some(lane) = self.lanes.remove(&key) {
                self.retiring.insert(key, lane.done);
            }
        }
    }

    fn start_worker(&mut self, key: RouteKey) -> Lane {
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let predecessor = self.retiring.remove(&key);
        debug!(route = %key, "Starting route worker");
        self.workers.spawn(run_lane(
            self.reconciler.clone(),
            key,
            rx,
            predecessor,
            done_tx,
        ));
        Lane { tx, done: done_rx }
    }

    /// Collect finished workers and closed queues without waiting.
    fn reap(&mut self) {
        while let Some(result) = self.workers.try_join_next() {
            match result {
                Ok(key) => debug!(route = %key, "Route worker finished"),
                Err(e) => error!(error = %e, "Route worker panicked"),
            }
        }

        let closed: Vec<RouteKey> = self
            .lanes
            .iter()
            .filter(|(_, lane)| lane.tx.is_closed())
            .map(|(key, _)| key.clone())
            .collect();
        for key in closed {
            if let Some(lane) = self.lanes.remove(&key) {
                self.retiring.insert(key, lane.done);
            }
        }
        self.retiring.retain(|_, done| {
            matches!(done.try_recv(), Err(oneshot::error::TryRecvError::Empty))
        });
    }

    /// Number of keys with an open queue.
    #[must_use]
    pub fn active_lanes(&self) -> usize {
        self.lanes.values().filter(|lane| !lane.tx.is_closed()).count()
    }

    /// Number of worker tasks not yet collected.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Close every queue and wait for workers to finish their queued events.
    ///
    /// Workers still running after `timeout` are aborted. Returns `true` if
    /// every worker finished in time.
    pub async fn drain(&mut self, timeout: Duration) -> bool {
        self.lanes.clear();
        self.retiring.clear();

        let workers = &mut self.workers;
        let finished = tokio::time::timeout(timeout, async {
            while let Some(result) = workers.join_next().await {
                if let Err(e) = result {
                    error!(error = %e, "Route worker panicked");
                }
            }
        })
        .await
        .is_ok();

        if !finished {
            warn!(
                remaining = self.workers.len(),
                "Route workers did not finish in time, aborting"
            );
            self.workers.abort_all();
        }
        finished
    }
}

async fn run_lane(
    reconciler: Reconciler,
    key: RouteKey,
    mut rx: mpsc::UnboundedReceiver<RouteEvent>,
    predecessor: Option<oneshot::Receiver<()>>,
    _done: oneshot::Sender<()>,
) -> RouteKey {
    if let Some(predecessor) = predecessor {
        // Resolves when the previous worker drops its sender.
        let _ = predecessor.await;
    }

    // Errors are logged by the reconciler.
    while let Some(event) = rx.recv().await {
        match event {
            RouteEvent::Applied(route) => {
                let _ = reconciler.observe(&route, Trigger::Observed).await;
            }
            RouteEvent::Deleted(route) => {
                let _ = reconciler.delete(&route).await;
                break;
            }
        }

        // Events sent before the close are still received.
        if rx.is_empty() {
            rx.close();
        }
    }

    key
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod dispatch_tests;
