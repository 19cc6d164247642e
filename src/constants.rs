// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the routedns controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the Gateway API resources watched by the controller
pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// Kind name for `HTTPRoute` resource
pub const KIND_HTTP_ROUTE: &str = "HTTPRoute";

/// Kind name for `Gateway` resource
pub const KIND_GATEWAY: &str = "Gateway";

/// Gateway status address type carrying an IP literal
pub const GATEWAY_ADDRESS_TYPE_IP: &str = "IPAddress";

// ============================================================================
// DNS Constants
// ============================================================================

/// TTL value the provider interprets as "automatic"
pub const AUTO_TTL: u32 = 1;

/// Minimum number of labels a record name needs to derive a zone
pub const MIN_RECORD_LABELS: usize = 2;

/// Number of trailing labels that make up the zone name
pub const ZONE_LABELS: usize = 2;

// ============================================================================
// Controller Defaults
// ============================================================================

/// Default owner marker written on every record the controller creates or updates
pub const DEFAULT_RECORD_OWNER_ID: &str = "routedns";

/// Default annotation prefix for route intent keys
pub const DEFAULT_ANNOTATION_PREFIX: &str = "routedns/";

/// Default interval between periodic sweeps (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Default delay before restarting a closed route watch
pub const DEFAULT_WATCH_RECONNECT_DELAY_SECS: u64 = 5;

/// Default graceful shutdown budget for in-flight work
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Maximum number of tracked routes reconciled concurrently by one sweep
pub const SWEEP_CONCURRENCY: usize = 8;

/// Capacity of the channel carrying watch events out of a watch session
pub const WATCH_EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Public Address Lookup
// ============================================================================

/// Default IPv4-only public address lookup endpoint
pub const DEFAULT_IPV4_LOOKUP_URL: &str = "https://api.ipify.org";

/// Default IPv6 public address lookup endpoint
pub const DEFAULT_IPV6_LOOKUP_URL: &str = "https://api64.ipify.org";

/// Default timeout for a single public address lookup
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// DNS Provider
// ============================================================================

/// Cloudflare API v4 base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default timeout for a single Cloudflare API request
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Health Server
// ============================================================================

/// Default bind address of the liveness and metrics server
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8080";

/// Liveness endpoint path
pub const HEALTHZ_PATH: &str = "/healthz";

/// Prometheus scrape endpoint path
pub const METRICS_PATH: &str = "/metrics";
