// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route reconciliation state machine.
//!
//! A route is either unmanaged (no recognized intent) or managed (tracked in
//! the [`TrackedRouteStore`](crate::store::TrackedRouteStore)). The
//! [`Reconciler`] moves routes between those states:
//!
//! - [`Reconciler::observe`] - a route was added or modified, or is being
//!   re-evaluated by a sweep. Extract the intent, resolve addresses, apply
//!   them at the provider and remember what was applied.
//! - [`Reconciler::delete`] - the cluster reported a deletion. Remove the
//!   route's records (unless the strategy forbids it) and stop tracking it.
//! - [`Reconciler::sweep`] - re-evaluate every tracked route, dropping the
//!   ones that no longer exist.
//!
//! Work on one route key is serialized through the store's per-route lock.
//! A failure while handling one route is logged and reported for that route
//! only. Tracked state is left as it was so a later trigger can retry, except
//! when the provider was unavailable: the route is then tracked with no
//! applied addresses so the next sweep writes its records.

use crate::constants::SWEEP_CONCURRENCY;
use crate::context::Context;
use crate::crd::{GatewayRef, HTTPRoute, RouteKey};
use crate::errors::{Error, Result};
use crate::gateway;
use crate::intent::{self, ContentMode, RouteIntent};
use crate::metrics;
use crate::store::TrackedRoute;
use futures::StreamExt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What caused an observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// A watch event (initial listing, add or modify)
    Observed,
    /// The periodic sweep
    Periodic,
}

impl Trigger {
    /// Metric label of this trigger.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observed => "observed",
            Self::Periodic => "periodic",
        }
    }
}

/// Result of [`Reconciler::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// The route carries no intent; it is not tracked
    Unmanaged,
    /// DDNS address unchanged since the last apply; no provider call was made
    Skipped,
    /// The records were applied and the tracked state overwritten
    Applied,
}

impl ObserveOutcome {
    /// Metric label of this outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unmanaged => "unmanaged",
            Self::Skipped => "skipped",
            Self::Applied => "applied",
        }
    }
}

/// Result of [`Reconciler::delete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteSummary {
    /// The route carried no intent; nothing to remove at the provider
    Untracked,
    /// The strategy forbids deletions; only tracking was dropped
    DeletionDisabled,
    /// The route's records were removed (or already absent)
    Removed,
}

impl DeleteSummary {
    /// Metric label of this summary.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Untracked => "untracked",
            Self::DeletionDisabled => "deletion_disabled",
            Self::Removed => "removed",
        }
    }
}

/// Counts of one [`Reconciler::sweep`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Routes whose records were applied
    pub reconciled: usize,
    /// Routes dropped from tracking (gone from the cluster or now unmanaged)
    pub dropped: usize,
    /// DDNS routes whose address was unchanged
    pub skipped: usize,
    /// Routes that failed and keep their previous tracked state
    pub failed: usize,
}

enum SweepItem {
    Reconciled,
    Dropped,
    Skipped,
    Failed,
}

/// Reconciles routes against the DNS provider.
#[derive(Clone)]
pub struct Reconciler {
    ctx: Arc<Context>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("settings", &self.ctx.settings)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler over a shared context.
    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Shared context.
    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Observe a route that was added, modified or is being re-evaluated.
    ///
    /// # Errors
    ///
    /// Returns the per-route error that stopped the reconciliation. Tracked
    /// state is unchanged in that case, unless the provider was unavailable
    /// (see the module docs).
    pub async fn observe(&self, route: &HTTPRoute, trigger: Trigger) -> Result<ObserveOutcome> {
        let start = Instant::now();
        let key = route.key()?;

        let result = {
            let _guard = self.ctx.store.lock_route(&key).await;
            self.observe_locked(&key, route, trigger).await
        };

        self.finish_observation(&key, trigger, start, result)
    }

    fn finish_observation(
        &self,
        key: &RouteKey,
        trigger: Trigger,
        start: Instant,
        result: Result<ObserveOutcome>,
    ) -> Result<ObserveOutcome> {
        let outcome = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(e) => {
                warn!(
                    route = %key,
                    trigger = trigger.as_str(),
                    reason = e.reason(),
                    transient = e.is_transient(),
                    error = %e,
                    "Failed to reconcile route"
                );
                metrics::record_error(e.reason());
                e.reason()
            }
        };
        metrics::record_reconciliation(trigger.as_str(), outcome, start.elapsed());
        metrics::set_tracked_routes(self.ctx.store.len());

        result
    }

    async fn observe_locked(
        &self,
        key: &RouteKey,
        route: &HTTPRoute,
        trigger: Trigger,
    ) -> Result<ObserveOutcome> {
        let Some(intent) = intent::extract(&self.ctx.settings.annotation_prefix, route)? else {
            if self.ctx.store.remove(key).is_some() {
                info!(route = %key, "Route no longer carries DNS intent, stopped tracking");
            }
            return Ok(ObserveOutcome::Unmanaged);
        };

        let (addresses, gateway) = self.resolve_addresses(route, &intent).await?;

        if trigger == Trigger::Periodic && intent.content_mode == ContentMode::Ddns {
            if let Some(tracked) = self.ctx.store.get(key) {
                if tracked.last_addresses == addresses && same_intent(&tracked, &intent) {
                    debug!(route = %key, addresses = ?addresses, "Public address unchanged");
                    return Ok(ObserveOutcome::Skipped);
                }
            }
        }

        let report = match self.ctx.records.apply_addresses(&intent, &addresses).await {
            Ok(report) => report,
            Err(e) => return Err(self.keep_for_retry(key, &intent, gateway, e)),
        };
        if let Some(e) = report.first_error().filter(|_| report.all_failed()) {
            return Err(self.keep_for_retry(key, &intent, gateway, e.clone()));
        }

        let applied = report.applied_addresses();
        info!(
            route = %key,
            record = %intent.record_name,
            zone = %intent.zone_name,
            record_type = %intent.record_type,
            mode = %intent.content_mode,
            addresses = ?applied,
            "Reconciled route"
        );
        self.ctx
            .store
            .upsert(key.clone(), TrackedRoute::new(&intent, applied, gateway));

        Ok(ObserveOutcome::Applied)
    }

    /// Track a route whose records could not be written because the provider
    /// was unavailable, so the next sweep writes them. No addresses are
    /// recorded as applied, which keeps the periodic DDNS skip from firing.
    fn keep_for_retry(
        &self,
        key: &RouteKey,
        intent: &RouteIntent,
        gateway: Option<GatewayRef>,
        error: Error,
    ) -> Error {
        if error.is_transient() {
            debug!(route = %key, "Provider unavailable, route queued for the next sweep");
            self.ctx
                .store
                .upsert(key.clone(), TrackedRoute::new(intent, Vec::new(), gateway));
        }
        error
    }

    async fn resolve_addresses(
        &self,
        route: &HTTPRoute,
        intent: &RouteIntent,
    ) -> Result<(Vec<IpAddr>, Option<GatewayRef>)> {
        match intent.content_mode {
            ContentMode::Ddns => {
                let addresses = self.ctx.detector.resolve(intent.record_type).await?;
                Ok((addresses, None))
            }
            ContentMode::GatewayAddress => {
                let gateway_ref = route.gateway_ref()?;
                let gateway = self
                    .ctx
                    .cluster
                    .get_gateway(&gateway_ref.namespace, &gateway_ref.name)
                    .await?
                    .ok_or_else(|| Error::GatewayNotFound {
                        gateway: gateway_ref.to_string(),
                    })?;
                let addresses = gateway::addresses_for(&gateway, intent.record_type)?;
                Ok((addresses, Some(gateway_ref)))
            }
        }
    }

    /// Handle a cluster-observed route deletion.
    ///
    /// The route is removed from tracking in every case, including when the
    /// provider reports an error.
    ///
    /// # Errors
    ///
    /// Returns the first error met while removing the route's records.
    pub async fn delete(&self, route: &HTTPRoute) -> Result<DeleteSummary> {
        let start = Instant::now();
        let key = route.key()?;

        let result = {
            let _guard = self.ctx.store.lock_route(&key).await;
            let result = self.delete_locked(&key, route).await;
            self.ctx.store.remove(&key);
            result
        };

        let outcome = match &result {
            Ok(summary) => {
                info!(route = %key, outcome = summary.as_str(), "Route deleted, stopped tracking");
                summary.as_str()
            }
            Err(e) => {
                warn!(
                    route = %key,
                    reason = e.reason(),
                    error = %e,
                    "Failed to remove records of deleted route, stopped tracking"
                );
                metrics::record_error(e.reason());
                e.reason()
            }
        };
        metrics::record_reconciliation("deleted", outcome, start.elapsed());
        metrics::set_tracked_routes(self.ctx.store.len());

        result
    }

    async fn delete_locked(&self, key: &RouteKey, route: &HTTPRoute) -> Result<DeleteSummary> {
        if !self.ctx.settings.strategy.deletes_records() {
            debug!(route = %key, "Deletion disabled by strategy, keeping records");
            return Ok(DeleteSummary::DeletionDisabled);
        }

        let Some(intent) = intent::extract(&self.ctx.settings.annotation_prefix, route)? else {
            return Ok(DeleteSummary::Untracked);
        };

        let report = self.ctx.records.remove_records(&intent).await?;
        match report.first_error() {
            Some(e) => Err(e.clone()),
            None => Ok(DeleteSummary::Removed),
        }
    }

    /// Re-evaluate every tracked route.
    ///
    /// Each route is re-fetched under its per-route lock. Routes that no
    /// longer exist in the cluster are dropped from tracking without touching
    /// the provider. Routes that still exist are observed
    /// again with [`Trigger::Periodic`].
    pub async fn sweep(&self) -> SweepSummary {
        let start = Instant::now();
        let keys = self.ctx.store.keys();
        debug!(routes = keys.len(), "Starting periodic sweep");

        let items: Vec<SweepItem> = futures::stream::iter(keys)
            .map(|key| self.sweep_one(key))
            .buffer_unordered(SWEEP_CONCURRENCY)
            .collect()
            .await;

        let mut summary = SweepSummary::default();
        for item in items {
            match item {
                SweepItem::Reconciled => summary.reconciled += 1,
                SweepItem::Dropped => summary.dropped += 1,
                SweepItem::Skipped => summary.skipped += 1,
                SweepItem::Failed => summary.failed += 1,
            }
        }

        metrics::record_sweep(start.elapsed());
        metrics::set_tracked_routes(self.ctx.store.len());
        info!(
            reconciled = summary.reconciled,
            dropped = summary.dropped,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed = ?start.elapsed(),
            "Periodic sweep finished"
        );

        summary
    }

    async fn sweep_one(&self, key: RouteKey) -> SweepItem {
        let start = Instant::now();
        // Held across the re-fetch so a deletion handled meanwhile cannot be
        // undone by a stale copy of the route.
        let _guard = self.ctx.store.lock_route(&key).await;
        if !self.ctx.store.contains(&key) {
            debug!(route = %key, "Route stopped being tracked before its sweep");
            return SweepItem::Dropped;
        }

        match self.ctx.cluster.get_route(&key.namespace, &key.name).await {
            Ok(None) => {
                self.ctx.store.remove(&key);
                info!(route = %key, "Route no longer exists, stopped tracking");
                SweepItem::Dropped
            }
            Ok(Some(route)) => {
                let result = self.observe_locked(&key, &route, Trigger::Periodic).await;
                match self.finish_observation(&key, Trigger::Periodic, start, result) {
                    Ok(ObserveOutcome::Applied) => SweepItem::Reconciled,
                    Ok(ObserveOutcome::Skipped) => SweepItem::Skipped,
                    Ok(ObserveOutcome::Unmanaged) => SweepItem::Dropped,
                    Err(_) => SweepItem::Failed,
                }
            }
            Err(e) => {
                warn!(route = %key, error = %e, "Failed to fetch tracked route, keeping it");
                metrics::record_error(e.reason());
                SweepItem::Failed
            }
        }
    }
}

fn same_intent(tracked: &TrackedRoute, intent: &RouteIntent) -> bool {
    tracked.content_mode == intent.content_mode
        && tracked.record_type == intent.record_type
        && tracked.record_name == intent.record_name
        && tracked.zone_name == intent.zone_name
        && tracked.ttl == intent.ttl
        && tracked.proxied == intent.proxied
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
