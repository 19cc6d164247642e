// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route reconciliation.
//!
//! routedns follows the usual controller pattern, driven from two sources:
//!
//! 1. **Watch** - route add/modify/delete events, dispatched per route key
//! 2. **Sweep** - a periodic pass over every tracked route
//!
//! Both end in the [`Reconciler`], which compares the intent carried by a
//! route's annotations with what the DNS provider holds and applies the
//! difference.
//!
//! # Example: Reconciling a Route
//!
//! ```rust,no_run
//! use routedns::context::Context;
//! use routedns::crd::HTTPRoute;
//! use routedns::reconcilers::{Reconciler, Trigger};
//! use std::sync::Arc;
//!
//! async fn reconcile_route(ctx: Arc<Context>, route: HTTPRoute) -> routedns::errors::Result<()> {
//!     let reconciler = Reconciler::new(ctx);
//!     reconciler.observe(&route, Trigger::Observed).await?;
//!     Ok(())
//! }
//! ```

pub mod engine;

pub use engine::{DeleteSummary, ObserveOutcome, Reconciler, SweepSummary, Trigger};
