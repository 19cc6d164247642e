// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterApi`].
//!
//! Holds routes and gateways in maps and lets the caller push watch events
//! into the current session, end it, or make the next opens fail.

use super::{ClusterApi, RouteEvent};
use crate::constants::WATCH_EVENT_CHANNEL_CAPACITY;
use crate::crd::{Gateway, HTTPRoute, RouteKey};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

#[derive(Default)]
struct State {
    routes: BTreeMap<RouteKey, HTTPRoute>,
    gateways: BTreeMap<(String, String), Gateway>,
    session: Option<mpsc::Sender<RouteEvent>>,
    unreachable: bool,
    failing_opens: usize,
    opens: usize,
    route_reads: usize,
}

/// Cluster double backed by in-memory maps.
#[derive(Default)]
pub struct InMemoryCluster {
    state: Mutex<State>,
}

impl std::fmt::Debug for InMemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryCluster")
            .field("routes", &state.routes.len())
            .field("gateways", &state.gateways.len())
            .field("opens", &state.opens)
            .finish_non_exhaustive()
    }
}

impl InMemoryCluster {
    /// Create an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a route.
    ///
    /// # Errors
    ///
    /// Returns `MalformedObject` if the route has no name or namespace.
    pub fn put_route(&self, route: HTTPRoute) -> Result<()> {
        let key = route.key()?;
        self.lock().routes.insert(key, route);
        Ok(())
    }

    /// Remove a route, returning it if it existed.
    pub fn remove_route(&self, namespace: &str, name: &str) -> Option<HTTPRoute> {
        self.lock().routes.remove(&RouteKey::new(namespace, name))
    }

    /// Store or replace a gateway.
    pub fn put_gateway(&self, gateway: Gateway) {
        let key = (gateway.namespace().unwrap_or_default(), gateway.name_any());
        self.lock().gateways.insert(key, gateway);
    }

    /// Make every read and open fail with a connectivity error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make the next `count` watch opens fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.lock().failing_opens = count;
    }

    /// Number of watch open attempts, failed ones included.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    /// Number of `get_route` calls.
    #[must_use]
    pub fn route_reads(&self) -> usize {
        self.lock().route_reads
    }

    /// True while a watch session is open and its receiver alive.
    #[must_use]
    pub fn session_open(&self) -> bool {
        self.lock()
            .session
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver an event to the open session.
    ///
    /// Returns `false` if no session is open.
    pub async fn emit(&self, event: RouteEvent) -> bool {
        let tx = self.lock().session.clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// End the open session; its receiver sees the channel close.
    pub fn end_session(&self) {
        self.lock().session = None;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ClusterApi for InMemoryCluster {
    async fn get_route(&self, namespace: &str, name: &str) -> Result<Option<HTTPRoute>> {
        let mut state = self.lock();
        state.route_reads += 1;
        if state.unreachable {
            return Err(Error::connectivity("memory", "cluster unreachable"));
        }
        Ok(state.routes.get(&RouteKey::new(namespace, name)).cloned())
    }

    async fn get_gateway(&self, namespace: &str, name: &str) -> Result<Option<Gateway>> {
        let state = self.lock();
        if state.unreachable {
            return Err(Error::connectivity("memory", "cluster unreachable"));
        }
        Ok(state
            .gateways
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn watch_routes(&self) -> Result<mpsc::Receiver<RouteEvent>> {
        let mut state = self.lock();
        state.opens += 1;
        if state.unreachable {
            return Err(Error::connectivity("memory", "cluster unreachable"));
        }
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(Error::connectivity("memory", "watch open refused"));
        }

        let capacity = WATCH_EVENT_CHANNEL_CAPACITY.max(state.routes.len());
        let (tx, rx) = mpsc::channel(capacity);
        for route in state.routes.values() {
            tx.try_send(RouteEvent::Applied(route.clone()))
                .map_err(|e| Error::connectivity("memory", e))?;
        }
        state.session = Some(tx);
        Ok(rx)
    }
}
