// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hermetic end-to-end tests of route reconciliation.
//!
//! Routes and gateways live in an in-memory cluster, records in an in-memory
//! provider that logs every call. No network access is needed.

mod common;

use common::{eventually, gateway, route, Harness, OWNER};
use routedns::cluster::RouteEvent;
use routedns::config::Strategy;
use routedns::crd::RouteKey;
use routedns::errors::Error;
use routedns::intent::{RecordKind, Ttl};
use routedns::provider::memory::ProviderCall;
use routedns::provider::DnsRecord;
use routedns::reconcilers::{DeleteSummary, ObserveOutcome, Trigger};
use routedns::retry::ReconnectPolicy;
use routedns::shutdown;
use routedns::ticker::TickerDriver;
use routedns::watcher::WatchDriver;
use std::net::IpAddr;
use std::time::Duration;

fn ip(value: &str) -> IpAddr {
    value.parse().unwrap()
}

fn creates(calls: &[ProviderCall]) -> Vec<&DnsRecord> {
    calls
        .iter()
        .filter_map(|call| match call {
            ProviderCall::Create(record) | ProviderCall::Update(record) => Some(record),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn route_without_content_mode_is_ignored() {
    let h = Harness::new(Strategy::Full);

    for annotations in [&[][..], &[("content-mode", "")][..], &[("type", "AAAA")][..]] {
        let r = route("app1", "api.example.com", annotations);
        let outcome = h.reconciler.observe(&r, Trigger::Observed).await.unwrap();
        assert_eq!(outcome, ObserveOutcome::Unmanaged);
    }

    assert!(h.provider.calls().is_empty());
    assert!(h.context().store.is_empty());
}

#[tokio::test]
async fn unparsable_ttl_becomes_auto() {
    let h = Harness::new(Strategy::Full);
    h.cluster.put_gateway(gateway(&["198.51.100.7"]));

    let r = route(
        "app1",
        "api.example.com",
        &[("content-mode", "gateway-address"), ("ttl", "five minutes")],
    );
    h.reconciler.observe(&r, Trigger::Observed).await.unwrap();

    let records = h.provider.records_named("api.example.com", RecordKind::A);
    assert_eq!(records[0].ttl, 1);
    let tracked = h.context().store.get(&RouteKey::new("web", "app1")).unwrap();
    assert_eq!(tracked.ttl, Ttl::Auto);
}

#[tokio::test]
async fn gateway_route_creates_single_a_record() {
    let h = Harness::new(Strategy::Full);
    h.cluster.put_gateway(gateway(&["198.51.100.7"]));

    let r = route(
        "app1",
        "api.example.com",
        &[("content-mode", "gateway-address"), ("type", "A")],
    );
    h.reconciler.observe(&r, Trigger::Observed).await.unwrap();

    let calls = h.provider.calls();
    assert!(calls.contains(&ProviderCall::ZoneId("example.com".to_string())));
    let written = creates(&calls);
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].kind, RecordKind::A);
    assert_eq!(written[0].name, "api.example.com");
    assert_eq!(written[0].content, "198.51.100.7");
    assert_eq!(written[0].owner, OWNER);

    let tracked = h.context().store.get(&RouteKey::new("web", "app1")).unwrap();
    assert_eq!(tracked.zone_name, "example.com");
}

#[tokio::test]
async fn dual_route_writes_one_record_per_family() {
    let h = Harness::new(Strategy::Full);
    h.cluster
        .put_gateway(gateway(&["198.51.100.7", "198.51.100.8", "2001:db8::7", "2001:db8::8"]));

    let r = route(
        "app1",
        "api.example.com",
        &[("content-mode", "gateway-address"), ("type", "A/AAAA")],
    );
    h.reconciler.observe(&r, Trigger::Observed).await.unwrap();

    let calls = h.provider.calls();
    let written = creates(&calls);
    assert_eq!(written.len(), 2);
    assert_eq!(written[0].kind, RecordKind::A);
    assert_eq!(written[0].content, "198.51.100.7");
    assert_eq!(written[1].kind, RecordKind::Aaaa);
    assert_eq!(written[1].content, "2001:db8::7");
}

#[tokio::test]
async fn repeated_observation_issues_no_mutations() {
    let h = Harness::new(Strategy::Full);
    h.cluster.put_gateway(gateway(&["198.51.100.7"]));
    let r = route("app1", "api.example.com", &[("content-mode", "gateway-address")]);
    h.reconciler.observe(&r, Trigger::Observed).await.unwrap();
    h.provider.clear_calls();

    let outcome = h.reconciler.observe(&r, Trigger::Periodic).await.unwrap();

    assert_eq!(outcome, ObserveOutcome::Applied);
    assert!(h.provider.mutations().is_empty());
    assert!(!h.provider.calls().is_empty());
}

#[tokio::test]
async fn foreign_record_is_never_changed() {
    let h = Harness::new(Strategy::Full);
    h.cluster.put_gateway(gateway(&["198.51.100.7"]));
    h.provider
        .seed_record(
            "example.com",
            DnsRecord {
                owner: "external-dns".to_string(),
                ..DnsRecord::desired("api.example.com", ip("192.0.2.10"), Ttl::Seconds(60), false)
            },
        )
        .unwrap();
    let r = route("app1", "api.example.com", &[("content-mode", "gateway-address")]);

    let error = h
        .reconciler
        .observe(&r, Trigger::Observed)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::OwnershipConflict { .. }));

    let deleted = h.reconciler.delete(&r).await.unwrap_err();
    assert!(matches!(deleted, Error::OwnershipConflict { .. }));

    assert!(h.provider.mutations().is_empty());
    let records = h.provider.records_named("api.example.com", RecordKind::A);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "192.0.2.10");
    assert_eq!(records[0].owner, "external-dns");
}

#[tokio::test]
async fn ddns_sweeps_only_write_on_address_change() {
    let h = Harness::new(Strategy::Full);
    h.lookup.set_v4("203.0.113.5");
    let r = route("home", "home.example.com", &[("content-mode", "ddns")]);
    h.cluster.put_route(r.clone()).unwrap();
    h.reconciler.observe(&r, Trigger::Observed).await.unwrap();
    h.provider.clear_calls();

    for _ in 0..3 {
        let summary = h.reconciler.sweep().await;
        assert_eq!(summary.skipped, 1);
    }
    assert!(h.provider.calls().is_empty());

    h.lookup.set_v4("203.0.113.9");
    let summary = h.reconciler.sweep().await;
    assert_eq!(summary.reconciled, 1);

    let mutations = h.provider.mutations();
    assert_eq!(mutations.len(), 1);
    assert!(
        matches!(&mutations[0], ProviderCall::Update(record) if record.content == "203.0.113.9")
    );
}

#[tokio::test]
async fn deletion_with_upsert_only_strategy_keeps_records() {
    let h = Harness::new(Strategy::UpsertOnly);
    h.cluster.put_gateway(gateway(&["198.51.100.7"]));
    let r = route("app1", "api.example.com", &[("content-mode", "gateway-address")]);
    h.reconciler.observe(&r, Trigger::Observed).await.unwrap();
    h.provider.clear_calls();

    let summary = h.reconciler.delete(&r).await.unwrap();

    assert_eq!(summary, DeleteSummary::DeletionDisabled);
    assert!(!h
        .provider
        .calls()
        .iter()
        .any(|call| matches!(call, ProviderCall::Delete(_))));
    assert!(h.context().store.is_empty());
}

#[tokio::test]
async fn one_failing_route_does_not_affect_others() {
    let h = Harness::new(Strategy::Full);
    h.cluster.put_gateway(gateway(&["198.51.100.7"]));
    let broken = route("broken", "localhost", &[("content-mode", "gateway-address")]);
    let good = route("app1", "api.example.com", &[("content-mode", "gateway-address")]);

    let error = h
        .reconciler
        .observe(&broken, Trigger::Observed)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidZoneDerivation { .. }));

    h.reconciler
        .observe(&good, Trigger::Observed)
        .await
        .unwrap();
    assert_eq!(h.context().store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn drivers_keep_records_in_sync() {
    let h = Harness::new(Strategy::Full);
    h.cluster.put_gateway(gateway(&["198.51.100.7"]));
    h.lookup.set_v4("203.0.113.5");
    let app = route("app1", "api.example.com", &[("content-mode", "gateway-address")]);
    let home = route("home", "home.example.com", &[("content-mode", "ddns")]);
    h.cluster.put_route(app.clone()).unwrap();
    h.cluster.put_route(home.clone()).unwrap();

    let (stop, stop_rx) = shutdown::channel();
    let watch = tokio::spawn(
        WatchDriver::new(
            h.cluster.clone(),
            h.reconciler.clone(),
            ReconnectPolicy::fixed(Duration::from_secs(5)),
            Duration::from_secs(10),
        )
        .run(stop_rx.clone()),
    );
    let ticker = tokio::spawn(
        TickerDriver::new(h.reconciler.clone(), Duration::from_secs(60)).run(stop_rx),
    );

    let provider = h.provider.clone();
    eventually(|| provider.records().len() == 2).await;

    // Public address moves; the next sweep follows it.
    h.lookup.set_v4("203.0.113.9");
    eventually(|| {
        provider
            .records_named("home.example.com", RecordKind::A)
            .first()
            .is_some_and(|record| record.content == "203.0.113.9")
    })
    .await;

    // Watch session drops; the route is deleted while disconnected.
    h.cluster.end_session();
    h.cluster.remove_route("web", "app1");
    let cluster = h.cluster.clone();
    eventually(|| cluster.opens() == 2).await;

    // The next sweep notices the missing route without touching its record.
    let store = h.context().store.clone();
    eventually(|| !store.contains(&RouteKey::new("web", "app1"))).await;
    assert_eq!(provider.records_named("api.example.com", RecordKind::A).len(), 1);

    // A deletion delivered by the watch removes the record.
    assert!(h.cluster.emit(RouteEvent::Deleted(home)).await);
    eventually(|| provider.records_named("home.example.com", RecordKind::A).is_empty()).await;

    stop.send(true).unwrap();
    watch.await.unwrap();
    ticker.await.unwrap();
    assert!(store.is_empty());
}
