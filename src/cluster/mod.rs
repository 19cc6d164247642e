// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster access for routes and gateways.
//!
//! [`ClusterApi`] is everything the reconciler and the watch driver need from
//! Kubernetes: point reads of routes and gateways, and a stream of route
//! events. [`KubeCluster`] implements it with `kube`;
//! [`memory::InMemoryCluster`] holds routes and gateways in memory.
//!
//! A watch session is exposed as an `mpsc` receiver. The session ends, and
//! the channel closes, when the underlying watch fails; restarting it is the
//! watch driver's job.

pub mod memory;

use crate::constants::WATCH_EVENT_CHANNEL_CAPACITY;
use crate::crd::{Gateway, HTTPRoute};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const TARGET: &str = "kubernetes";

/// A change to a route observed by a watch session.
#[derive(Clone, Debug)]
pub enum RouteEvent {
    /// The route was added or modified (including the initial listing)
    Applied(HTTPRoute),
    /// The route was deleted; carries its last known state
    Deleted(HTTPRoute),
}

impl RouteEvent {
    /// The route carried by the event.
    #[must_use]
    pub fn route(&self) -> &HTTPRoute {
        match self {
            Self::Applied(route) | Self::Deleted(route) => route,
        }
    }
}

/// Read and watch access to the cluster.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetch a route; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Connectivity` if the API server cannot be reached.
    async fn get_route(&self, namespace: &str, name: &str) -> Result<Option<HTTPRoute>>;

    /// Fetch a gateway; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Connectivity` if the API server cannot be reached.
    async fn get_gateway(&self, namespace: &str, name: &str) -> Result<Option<Gateway>>;

    /// Open a watch session over all routes.
    ///
    /// The session starts with an `Applied` event for every existing route.
    /// The receiver closes when the session ends.
    ///
    /// # Errors
    ///
    /// Returns `Connectivity` if the session cannot be opened.
    async fn watch_routes(&self) -> Result<mpsc::Receiver<RouteEvent>>;
}

/// [`ClusterApi`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Create a cluster handle from a client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_route(&self, namespace: &str, name: &str) -> Result<Option<HTTPRoute>> {
        let api: Api<HTTPRoute> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| Error::connectivity(TARGET, e))
    }

    async fn get_gateway(&self, namespace: &str, name: &str) -> Result<Option<Gateway>> {
        let api: Api<Gateway> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| Error::connectivity(TARGET, e))
    }

    async fn watch_routes(&self) -> Result<mpsc::Receiver<RouteEvent>> {
        let api: Api<HTTPRoute> = Api::all(self.client.clone());

        // Unreachable API server or missing CRD is an open failure.
        api.list_metadata(&kube::api::ListParams::default().limit(1))
            .await
            .map_err(|e| Error::connectivity(TARGET, e))?;

        let (tx, rx) = mpsc::channel(WATCH_EVENT_CHANNEL_CAPACITY);
        tokio::spawn(run_session(api, tx));
        Ok(rx)
    }
}

async fn run_session(api: Api<HTTPRoute>, tx: mpsc::Sender<RouteEvent>) {
    let mut stream = watcher::watcher(api, watcher::Config::default()).boxed();
    debug!("Route watch session started");

    loop {
        let next = tokio::select! {
            () = tx.closed() => {
                debug!("Route watch receiver dropped, ending session");
                return;
            }
            next = stream.try_next() => next,
        };

        let event = match next {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("Route watch stream ended");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Route watch failed, ending session");
                return;
            }
        };

        let event = match event {
            Event::Apply(route) | Event::InitApply(route) => RouteEvent::Applied(route),
            Event::Delete(route) => RouteEvent::Deleted(route),
            Event::Init | Event::InitDone => continue,
        };

        if tx.send(event).await.is_err() {
            return;
        }
    }
}
