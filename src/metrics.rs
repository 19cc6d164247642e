// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the routedns controller.
//!
//! All metrics carry the namespace prefix `routedns_` and are registered in
//! [`METRICS_REGISTRY`], which the health server exposes on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Route reconciliations by trigger and outcome
//! - **Provider Metrics** - Single-record provider operations by outcome
//! - **Driver Metrics** - Tracked routes, sweeps and watch reconnects
//! - **Error Metrics** - Errors by reason code
//!
//! # Example
//!
//! ```rust,no_run
//! use routedns::metrics::record_reconciliation;
//!
//! record_reconciliation("observed", "applied", std::time::Duration::from_millis(120));
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, Opts,
    Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all routedns metrics
const METRICS_NAMESPACE: &str = "routedns";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of route reconciliations by trigger and outcome
///
/// Labels:
/// - `trigger`: What started the reconciliation (`observed`, `periodic`, `deleted`)
/// - `outcome`: Result (`applied`, `skipped`, `unmanaged`, `removed`, or an error reason)
pub static RECONCILIATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of route reconciliations by trigger and outcome",
    );
    let counter = CounterVec::new(opts, &["trigger", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of route reconciliations in seconds
///
/// Labels:
/// - `trigger`: What started the reconciliation
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of route reconciliations in seconds by trigger",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["trigger"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Provider Metrics
// ============================================================================

/// Total number of single-record provider operations
///
/// Labels:
/// - `operation`: `upsert` or `delete`
/// - `record_type`: `A` or `AAAA`
/// - `outcome`: `created`, `updated`, `unchanged`, `deleted`, `not_found`, or an error reason
pub static PROVIDER_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_provider_operations_total"),
        "Total number of DNS provider record operations by operation, type and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "record_type", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Driver Metrics
// ============================================================================

/// Number of routes currently tracked
pub static TRACKED_ROUTES: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_tracked_routes"),
        "Number of routes currently tracked by the controller",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Duration of periodic sweeps in seconds
pub static SWEEP_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_sweep_duration_seconds"),
        "Duration of periodic sweeps over all tracked routes",
    )
    .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of route watch reconnects
pub static WATCH_RECONNECTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        format!("{METRICS_NAMESPACE}_watch_reconnects_total"),
        "Total number of route watch session restarts",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by reason code
///
/// Labels:
/// - `reason`: Stable reason code of the error (e.g. `OwnershipConflict`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a route reconciliation
///
/// # Arguments
/// * `trigger` - What started it (`observed`, `periodic`, `deleted`)
/// * `outcome` - How it ended
/// * `duration` - How long it took
pub fn record_reconciliation(trigger: &str, outcome: &str, duration: Duration) {
    RECONCILIATIONS_TOTAL
        .with_label_values(&[trigger, outcome])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[trigger])
        .observe(duration.as_secs_f64());
}

/// Record a single-record provider operation
pub fn record_provider_operation(operation: &str, record_type: &str, outcome: &str) {
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[operation, record_type, outcome])
        .inc();
}

/// Record an error by its reason code
pub fn record_error(reason: &str) {
    ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

/// Publish the number of tracked routes
#[allow(clippy::cast_precision_loss)]
pub fn set_tracked_routes(count: usize) {
    TRACKED_ROUTES.set(count as f64);
}

/// Record a completed sweep
pub fn record_sweep(duration: Duration) {
    SWEEP_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a watch session restart
pub fn record_watch_reconnect() {
    WATCH_RECONNECTS_TOTAL.inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation() {
        let trigger = "test-trigger";
        record_reconciliation(trigger, "applied", Duration::from_millis(500));

        let counter = RECONCILIATIONS_TOTAL.with_label_values(&[trigger, "applied"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[trigger]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_provider_operation() {
        record_provider_operation("upsert", "A", "test-created");

        let counter = PROVIDER_OPERATIONS_TOTAL.with_label_values(&["upsert", "A", "test-created"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_error() {
        record_error("TestReason");
        assert!(ERRORS_TOTAL.with_label_values(&["TestReason"]).get() > 0.0);
    }

    #[test]
    fn test_watch_reconnects_increase() {
        let before = WATCH_RECONNECTS_TOTAL.get();
        record_watch_reconnect();
        assert!(WATCH_RECONNECTS_TOTAL.get() > before);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation("test-gather", "applied", Duration::from_millis(100));
        set_tracked_routes(3);
        record_sweep(Duration::from_millis(10));

        let metrics = gather_metrics().unwrap();
        assert!(metrics.contains("routedns_reconciliations_total"));
        assert!(metrics.contains("routedns_tracked_routes"));
        assert!(metrics.contains("routedns_sweep_duration_seconds"));
    }
}
