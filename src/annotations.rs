// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route annotation keys and values understood by the controller.
//!
//! Keys are matched after stripping the configured annotation prefix
//! (`routedns/` by default), so `routedns/content-mode` becomes `content-mode`.

// ============================================================================
// Intent Keys
// ============================================================================

/// Required key selecting where record content comes from
pub const CONTENT_MODE: &str = "content-mode";

/// Optional key selecting the record type (`A`, `AAAA`, `A/AAAA`)
pub const RECORD_TYPE: &str = "type";

/// Optional key with the record TTL in seconds, or `auto`
pub const TTL: &str = "ttl";

/// Optional key toggling the provider proxy (`true` / `false`)
pub const PROXIED: &str = "proxied";

// ============================================================================
// Intent Values
// ============================================================================

/// Content mode: record content is the parent Gateway's address
pub const CONTENT_MODE_GATEWAY_ADDRESS: &str = "gateway-address";

/// Content mode: record content is the controller's own public address
pub const CONTENT_MODE_DDNS: &str = "ddns";

/// Record type value for IPv4 address records
pub const RECORD_TYPE_A: &str = "A";

/// Record type value for IPv6 address records
pub const RECORD_TYPE_AAAA: &str = "AAAA";

/// Record type value requesting both address families
pub const RECORD_TYPE_DUAL: &str = "A/AAAA";

/// TTL value requesting the provider's automatic TTL
pub const TTL_AUTO: &str = "auto";
