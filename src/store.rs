// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tracked-route store.
//!
//! The store maps each managed route to the intent and addresses last applied
//! for it. It is the only place the reconciler remembers anything between
//! triggers, and it lives in memory only.
//!
//! Two kinds of locks are involved:
//!
//! - The entry map sits behind a reader/writer lock. Reads (sweep listing,
//!   no-op comparison) share it; a single entry write takes it exclusively for
//!   the duration of that write only. It is never held across an `.await`.
//! - Each route key has its own async mutex, obtained with
//!   [`TrackedRouteStore::lock_route`]. The reconciler holds it for the whole
//!   read → provider call → write sequence of one key, so two reconciliations
//!   of the same route never interleave while different routes proceed in
//!   parallel.

use crate::crd::{GatewayRef, RouteKey};
use crate::intent::{ContentMode, RecordType, RouteIntent, Ttl};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::OwnedMutexGuard;

/// Last applied state of a managed route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedRoute {
    /// Source of record content
    pub content_mode: ContentMode,
    /// Zone holding the record
    pub zone_name: String,
    /// Record name
    pub record_name: String,
    /// Requested record type
    pub record_type: RecordType,
    /// Record TTL
    pub ttl: Ttl,
    /// Provider proxy flag
    pub proxied: bool,
    /// Addresses applied on the last reconciliation, IPv4 first
    pub last_addresses: Vec<IpAddr>,
    /// Parent gateway, for gateway-address mode
    pub gateway: Option<GatewayRef>,
}

impl TrackedRoute {
    /// Build a tracked entry from an applied intent.
    #[must_use]
    pub fn new(intent: &RouteIntent, addresses: Vec<IpAddr>, gateway: Option<GatewayRef>) -> Self {
        Self {
            content_mode: intent.content_mode,
            zone_name: intent.zone_name.clone(),
            record_name: intent.record_name.clone(),
            record_type: intent.record_type,
            ttl: intent.ttl,
            proxied: intent.proxied,
            last_addresses: addresses,
            gateway,
        }
    }
}

/// Concurrency-safe map from route identity to [`TrackedRoute`].
#[derive(Debug, Default)]
pub struct TrackedRouteStore {
    entries: RwLock<HashMap<RouteKey, TrackedRoute>>,
    route_locks: Mutex<HashMap<RouteKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl TrackedRouteStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize work on one route key.
    ///
    /// The returned guard must be held across the whole reconciliation of
    /// `key`; it does not block other keys.
    pub async fn lock_route(&self, key: &RouteKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .route_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            locks.retain(|existing, lock| existing == key || Arc::strong_count(lock) > 1);
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Tracked state of `key`.
    #[must_use]
    pub fn get(&self, key: &RouteKey) -> Option<TrackedRoute> {
        self.read().get(key).cloned()
    }

    /// True if `key` is tracked.
    #[must_use]
    pub fn contains(&self, key: &RouteKey) -> bool {
        self.read().contains_key(key)
    }

    /// Insert or overwrite the tracked state of `key`.
    pub fn upsert(&self, key: RouteKey, route: TrackedRoute) {
        self.write().insert(key, route);
    }

    /// Stop tracking `key`, returning its last state.
    pub fn remove(&self, key: &RouteKey) -> Option<TrackedRoute> {
        self.write().remove(key)
    }

    /// Keys of every tracked route, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<RouteKey> {
        let mut keys: Vec<RouteKey> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy of every tracked entry.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<RouteKey, TrackedRoute> {
        self.read().clone()
    }

    /// Number of tracked routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RouteKey, TrackedRoute>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RouteKey, TrackedRoute>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
