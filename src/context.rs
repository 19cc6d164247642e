// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the reconciler and the drivers.
//!
//! Every component receives an `Arc<Context>` holding:
//! - Cluster access for routes and gateways
//! - The ownership-aware DNS record manager
//! - The public address detector for DDNS routes
//! - The tracked-route store
//! - The settings that shape reconciliation

use crate::cluster::ClusterApi;
use crate::config::{Config, Strategy};
use crate::ddns::PublicAddressDetector;
use crate::provider::RecordManager;
use crate::store::TrackedRouteStore;
use std::sync::Arc;

/// Reconciliation settings taken from the configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Annotation prefix of intent keys (ends with `/`)
    pub annotation_prefix: String,
    /// Record management strategy
    pub strategy: Strategy,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            annotation_prefix: config.annotation_prefix.clone(),
            strategy: config.strategy,
        }
    }
}

/// Shared context passed to the reconciler and drivers.
#[derive(Clone)]
pub struct Context {
    /// Cluster access
    pub cluster: Arc<dyn ClusterApi>,

    /// Ownership-aware DNS record operations
    pub records: RecordManager,

    /// Public address resolution for DDNS routes
    pub detector: PublicAddressDetector,

    /// Last applied state per route
    pub store: Arc<TrackedRouteStore>,

    /// Reconciliation settings
    pub settings: Settings,
}

impl Context {
    /// Assemble a context with an empty tracked-route store.
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        records: RecordManager,
        detector: PublicAddressDetector,
        settings: Settings,
    ) -> Self {
        Self {
            cluster,
            records,
            detector,
            store: Arc::new(TrackedRouteStore::new()),
            settings,
        }
    }
}
