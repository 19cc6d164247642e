// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for per-route dispatch.

#[cfg(test)]
mod tests {
    use crate::cluster::memory::InMemoryCluster;
    use crate::cluster::RouteEvent;
    use crate::config::Strategy;
    use crate::context::{Context, Settings};
    use crate::crd::RouteKey;
    use crate::ddns::{AddressLookup, PublicAddressDetector};
    use crate::dispatch::Dispatcher;
    use crate::errors::{Error, Result};
    use crate::intent::RecordKind;
    use crate::provider::memory::InMemoryProvider;
    use crate::provider::RecordManager;
    use crate::reconcilers::Reconciler;
    use crate::test_fixtures::{gateway, route, PREFIX};
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::sync::Arc;
    use std::time::Duration;

    struct NoLookup;

    #[async_trait]
    impl AddressLookup for NoLookup {
        async fn lookup(&self, _kind: RecordKind) -> Result<IpAddr> {
            Err(Error::connectivity("none", "no lookup in dispatch tests"))
        }
    }

    fn setup() -> (Arc<InMemoryProvider>, Reconciler) {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.put_gateway(gateway(&["198.51.100.7", "2001:db8::7"]));
        let provider = Arc::new(InMemoryProvider::new());
        provider.add_zone("example.com");
        let ctx = Context::new(
            cluster,
            RecordManager::new(provider.clone(), "routedns"),
            PublicAddressDetector::new(Arc::new(NoLookup)),
            Settings {
                annotation_prefix: PREFIX.to_string(),
                strategy: Strategy::Full,
            },
        );
        (provider, Reconciler::new(Arc::new(ctx)))
    }

    fn managed(name: &str, hostname: &str, record_type: &str) -> RouteEvent {
        RouteEvent::Applied(route(
            name,
            hostname,
            &[("content-mode", "gateway-address"), ("type", record_type)],
        ))
    }

    #[tokio::test]
    async fn test_events_for_one_key_apply_in_order() {
        let (provider, reconciler) = setup();
        let store = reconciler.context().store.clone();
        let mut dispatcher = Dispatcher::new(reconciler);

        dispatcher.dispatch(managed("app1", "api.example.com", "A"));
        dispatcher.dispatch(managed("app1", "api.example.com", "AAAA"));
        assert_eq!(dispatcher.active_lanes(), 1);

        assert!(dispatcher.drain(Duration::from_secs(5)).await);

        assert_eq!(provider.records_named("api.example.com", RecordKind::A).len(), 1);
        assert_eq!(provider.records_named("api.example.com", RecordKind::Aaaa).len(), 1);
        let tracked = store.get(&RouteKey::new("web", "app1")).unwrap();
        assert_eq!(tracked.last_addresses, vec!["2001:db8::7".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_delete_retires_lane_and_later_events_start_fresh() {
        let (provider, reconciler) = setup();
        let store = reconciler.context().store.clone();
        let mut dispatcher = Dispatcher::new(reconciler);

        let event = managed("app1", "api.example.com", "A");
        let deleted = RouteEvent::Deleted(event.route().clone());
        dispatcher.dispatch(event);
        dispatcher.dispatch(deleted);
        assert_eq!(dispatcher.active_lanes(), 0);

        dispatcher.dispatch(managed("app1", "api.example.com", "A"));
        assert_eq!(dispatcher.active_lanes(), 1);

        assert!(dispatcher.drain(Duration::from_secs(5)).await);

        assert_eq!(provider.records_named("api.example.com", RecordKind::A).len(), 1);
        assert!(store.contains(&RouteKey::new("web", "app1")));
        assert_eq!(dispatcher.workers(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_get_their_own_lanes() {
        let (provider, reconciler) = setup();
        let mut dispatcher = Dispatcher::new(reconciler);

        dispatcher.dispatch(managed("app1", "api.example.com", "A"));
        dispatcher.dispatch(managed("app2", "www.example.com", "A"));
        assert_eq!(dispatcher.active_lanes(), 2);

        assert!(dispatcher.drain(Duration::from_secs(5)).await);
        assert_eq!(provider.records().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_worker_exits_and_key_restarts_on_next_event() {
        let (provider, reconciler) = setup();
        let store = reconciler.context().store.clone();
        let mut dispatcher = Dispatcher::new(reconciler);

        dispatcher.dispatch(managed("app1", "api.example.com", "A"));
        for _ in 0..100 {
            if dispatcher.active_lanes() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(dispatcher.active_lanes(), 0);
        assert_eq!(provider.records_named("api.example.com", RecordKind::A).len(), 1);

        // The next event for the idle key starts a new worker.
        dispatcher.dispatch(managed("app1", "api.example.com", "AAAA"));
        assert_eq!(dispatcher.active_lanes(), 1);
        assert!(dispatcher.drain(Duration::from_secs(5)).await);

        assert_eq!(provider.records_named("api.example.com", RecordKind::Aaaa).len(), 1);
        let tracked = store.get(&RouteKey::new("web", "app1")).unwrap();
        assert_eq!(tracked.last_addresses, vec!["2001:db8::7".parse::<IpAddr>().unwrap()]);
        assert_eq!(dispatcher.workers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_count_follows_pending_work() {
        let (provider, reconciler) = setup();
        let mut dispatcher = Dispatcher::new(reconciler);

        for (name, hostname) in [("app1", "api.example.com"), ("app2", "www.example.com")] {
            dispatcher.dispatch(managed(name, hostname, "A"));
        }
        for _ in 0..100 {
            if provider.records().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Dispatching collects the finished workers first.
        dispatcher.dispatch(managed("app3", "web.example.com", "A"));
        assert_eq!(dispatcher.workers(), 1);
        assert_eq!(dispatcher.active_lanes(), 1);

        assert!(dispatcher.drain(Duration::from_secs(5)).await);
        assert_eq!(provider.records().len(), 3);
    }

    #[tokio::test]
    async fn test_event_without_identity_is_ignored() {
        let (provider, reconciler) = setup();
        let mut dispatcher = Dispatcher::new(reconciler);

        let mut nameless = route("app1", "api.example.com", &[("content-mode", "gateway-address")]);
        nameless.metadata.name = None;
        dispatcher.dispatch(RouteEvent::Applied(nameless));

        assert_eq!(dispatcher.active_lanes(), 0);
        assert!(dispatcher.drain(Duration::from_secs(1)).await);
        assert!(provider.calls().is_empty());
    }
}
