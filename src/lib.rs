// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # routedns - DNS records for Gateway API routes
//!
//! routedns is a Kubernetes controller that keeps Cloudflare DNS `A`/`AAAA`
//! records in sync with `HTTPRoute` objects. A route opts in through
//! annotations; its first hostname becomes the record name and the record
//! content comes either from the parent Gateway's status addresses or from
//! the cluster's public address (dynamic DNS).
//!
//! ## Overview
//!
//! - Route intent is read from `routedns/*` annotations
//! - Records are written with an owner marker; records owned by someone else
//!   are never touched
//! - Route changes are handled as they are observed, and every tracked route
//!   is re-evaluated periodically to catch public address drift
//!
//! ## Modules
//!
//! - [`crd`] - Typed `HTTPRoute` and `Gateway` objects
//! - [`intent`] - Annotation parsing into a [`intent::RouteIntent`]
//! - [`gateway`] - Gateway status address selection
//! - [`ddns`] - Public address detection
//! - [`provider`] - DNS provider contract, Cloudflare client and ownership-aware record manager
//! - [`store`] - Tracked-route store
//! - [`reconcilers`] - The reconciliation engine
//! - [`dispatch`], [`watcher`], [`ticker`] - Change-source drivers
//! - [`health`] - Liveness and metrics endpoints
//!
//! ## Example
//!
//! ```rust,no_run
//! use routedns::intent::{extract_from, RecordType};
//! use routedns::crd::RouteKey;
//! use std::collections::BTreeMap;
//!
//! let annotations = BTreeMap::from([
//!     ("routedns/content-mode".to_string(), "ddns".to_string()),
//!     ("routedns/type".to_string(), "A/AAAA".to_string()),
//! ]);
//! let hostnames = vec!["home.example.com".to_string()];
//!
//! let intent = extract_from("routedns/", &RouteKey::new("web", "home"), &annotations, &hostnames)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(intent.record_type, RecordType::Dual);
//! assert_eq!(intent.zone_name, "example.com");
//! ```

pub mod annotations;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod ddns;
pub mod dispatch;
pub mod errors;
pub mod gateway;
pub mod health;
pub mod intent;
pub mod metrics;
pub mod provider;
pub mod reconcilers;
pub mod retry;
pub mod shutdown;
pub mod store;
pub mod ticker;
pub mod watcher;

#[cfg(test)]
mod test_fixtures;
