// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kube::client::Client;
use routedns::cluster::memory::InMemoryCluster;
use routedns::config::Strategy;
use routedns::context::{Context, Settings};
use routedns::crd::{Gateway, HTTPRoute};
use routedns::ddns::{AddressLookup, PublicAddressDetector};
use routedns::errors::{Error, Result};
use routedns::intent::RecordKind;
use routedns::provider::memory::InMemoryProvider;
use routedns::provider::RecordManager;
use routedns::reconcilers::Reconciler;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PREFIX: &str = "routedns/";
pub const OWNER: &str = "routedns";

/// Public address lookup with settable per-family answers.
#[derive(Default)]
pub struct StaticLookup {
    v4: Mutex<Option<IpAddr>>,
    v6: Mutex<Option<IpAddr>>,
}

impl StaticLookup {
    pub fn set_v4(&self, address: &str) {
        *self.v4.lock().unwrap() = Some(address.parse().unwrap());
    }

    pub fn set_v6(&self, address: &str) {
        *self.v6.lock().unwrap() = Some(address.parse().unwrap());
    }
}

#[async_trait]
impl AddressLookup for StaticLookup {
    async fn lookup(&self, kind: RecordKind) -> Result<IpAddr> {
        let answer = match kind {
            RecordKind::A => *self.v4.lock().unwrap(),
            RecordKind::Aaaa => *self.v6.lock().unwrap(),
        };
        answer.ok_or_else(|| Error::connectivity("static", format!("no {} answer", kind.family())))
    }
}

/// Everything a reconciliation test needs, wired with in-memory doubles.
pub struct Harness {
    pub cluster: Arc<InMemoryCluster>,
    pub provider: Arc<InMemoryProvider>,
    pub lookup: Arc<StaticLookup>,
    pub reconciler: Reconciler,
}

impl Harness {
    /// Harness with zone `example.com` registered at the provider.
    pub fn new(strategy: Strategy) -> Self {
        let cluster = Arc::new(InMemoryCluster::new());
        let provider = Arc::new(InMemoryProvider::new());
        provider.add_zone("example.com");
        let lookup = Arc::new(StaticLookup::default());
        let ctx = Context::new(
            cluster.clone(),
            RecordManager::new(provider.clone(), OWNER),
            PublicAddressDetector::new(lookup.clone()),
            Settings {
                annotation_prefix: PREFIX.to_string(),
                strategy,
            },
        );
        Self {
            cluster,
            provider,
            lookup,
            reconciler: Reconciler::new(Arc::new(ctx)),
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        self.reconciler.context()
    }
}

/// Parse an `HTTPRoute` from YAML.
pub fn route_from_yaml(yaml: &str) -> HTTPRoute {
    serde_yaml::from_str(yaml).expect("valid HTTPRoute YAML")
}

/// Parse a `Gateway` from YAML.
pub fn gateway_from_yaml(yaml: &str) -> Gateway {
    serde_yaml::from_str(yaml).expect("valid Gateway YAML")
}

/// Route `web/<name>` for `hostname`, attached to gateway `web/public`.
///
/// `annotations` are `key: value` lines without the prefix.
pub fn route(name: &str, hostname: &str, annotations: &[(&str, &str)]) -> HTTPRoute {
    let annotations: String = annotations
        .iter()
        .map(|(key, value)| format!("    {PREFIX}{key}: \"{value}\"\n"))
        .collect();
    let annotations = if annotations.is_empty() {
        "  annotations: {}\n".to_string()
    } else {
        format!("  annotations:\n{annotations}")
    };

    route_from_yaml(&format!(
        r"apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: {name}
  namespace: web
{annotations}spec:
  hostnames:
    - {hostname}
  parentRefs:
    - name: public
"
    ))
}

/// Gateway `web/public` reporting `addresses` in its status.
pub fn gateway(addresses: &[&str]) -> Gateway {
    let addresses: String = addresses
        .iter()
        .map(|value| format!("    - type: IPAddress\n      value: \"{value}\"\n"))
        .collect();

    gateway_from_yaml(&format!(
        r"apiVersion: gateway.networking.k8s.io/v1
kind: Gateway
metadata:
  name: public
  namespace: web
spec:
  gatewayClassName: envoy
status:
  addresses:
{addresses}"
    ))
}

/// Poll `check` until it holds, advancing (possibly paused) time in small steps.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..20_000 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}
