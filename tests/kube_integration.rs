// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests against a live Kubernetes cluster
//!
//! These tests need a cluster with the Gateway API CRDs installed. They only
//! read from the cluster.
//!
//! Run with: cargo test --test kube_integration -- --ignored

mod common;

use common::get_kube_client_or_skip;
use routedns::cluster::{ClusterApi, KubeCluster};
use std::time::Duration;

#[tokio::test]
#[ignore = "requires a Kubernetes cluster with Gateway API CRDs"]
async fn missing_objects_read_as_none() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let cluster = KubeCluster::new(client);

    let route = cluster
        .get_route("default", "routedns-does-not-exist")
        .await
        .expect("route read should succeed");
    assert!(route.is_none());

    let gateway = cluster
        .get_gateway("default", "routedns-does-not-exist")
        .await
        .expect("gateway read should succeed");
    assert!(gateway.is_none());
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster with Gateway API CRDs"]
async fn watch_session_opens_and_stays_open() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let cluster = KubeCluster::new(client);

    let mut events = cluster
        .watch_routes()
        .await
        .expect("watch should open");

    // Drain the initial listing; the channel must stay open afterwards.
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Some(event)) => println!("Observed route {:?}", event.route().metadata.name),
            Ok(None) => panic!("watch session closed unexpectedly"),
            Err(_) => break,
        }
    }
}
