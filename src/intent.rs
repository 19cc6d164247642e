// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS intent extraction from route annotations.
//!
//! A route opts into DNS management through prefix-scoped annotations:
//!
//! ```yaml
//! metadata:
//!   annotations:
//!     routedns/content-mode: ddns     # required: gateway-address | ddns
//!     routedns/type: A/AAAA           # optional: A (default) | AAAA | A/AAAA
//!     routedns/ttl: "300"             # optional: seconds or auto (default)
//!     routedns/proxied: "true"        # optional: true | false (default)
//! ```
//!
//! [`extract`] normalizes them into a [`RouteIntent`]. Extraction is a pure
//! function of the route: no cluster or provider access happens here.
//!
//! Lenient fields (`ttl`, `proxied`) degrade to their defaults with a warning.
//! Structural problems (no hostname, unusable zone, unknown record type or
//! content mode) are per-route errors.

use crate::annotations::{
    CONTENT_MODE, CONTENT_MODE_DDNS, CONTENT_MODE_GATEWAY_ADDRESS, PROXIED, RECORD_TYPE,
    RECORD_TYPE_A, RECORD_TYPE_AAAA, RECORD_TYPE_DUAL, TTL, TTL_AUTO,
};
use crate::constants::{AUTO_TTL, MIN_RECORD_LABELS, ZONE_LABELS};
use crate::crd::{HTTPRoute, RouteKey};
use crate::errors::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use tracing::warn;

/// Where the content of a route's records comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentMode {
    /// Addresses published in the parent Gateway's status
    GatewayAddress,
    /// The controller's own public address
    Ddns,
}

impl ContentMode {
    /// Parse a `content-mode` value.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedContentMode` for anything but `gateway-address` or `ddns`.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            CONTENT_MODE_GATEWAY_ADDRESS => Ok(Self::GatewayAddress),
            CONTENT_MODE_DDNS => Ok(Self::Ddns),
            _ => Err(Error::UnsupportedContentMode {
                value: value.to_string(),
            }),
        }
    }

    /// Annotation value of this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GatewayAddress => CONTENT_MODE_GATEWAY_ADDRESS,
            Self::Ddns => CONTENT_MODE_DDNS,
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-family address record kind, as stored at the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl RecordKind {
    /// Record kind matching the family of `address`.
    #[must_use]
    pub fn of(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => Self::A,
            IpAddr::V6(_) => Self::Aaaa,
        }
    }

    /// True if `address` belongs to this kind's address family.
    #[must_use]
    pub fn matches(self, address: &IpAddr) -> bool {
        Self::of(address) == self
    }

    /// DNS type name (`A` or `AAAA`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => RECORD_TYPE_A,
            Self::Aaaa => RECORD_TYPE_AAAA,
        }
    }

    /// Address family name (`IPv4` or `IPv6`).
    #[must_use]
    pub fn family(self) -> &'static str {
        match self {
            Self::A => "IPv4",
            Self::Aaaa => "IPv6",
        }
    }

    /// Parse a DNS type name.
    #[must_use]
    pub fn from_type_name(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case(RECORD_TYPE_A) {
            Some(Self::A)
        } else if value.eq_ignore_ascii_case(RECORD_TYPE_AAAA) {
            Some(Self::Aaaa)
        } else {
            None
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested record type of a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 only
    #[default]
    A,
    /// IPv6 only
    Aaaa,
    /// Both families
    Dual,
}

impl RecordType {
    /// Parse a `type` value, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedRecordType` for anything but `A`, `AAAA` or `A/AAAA`.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(RECORD_TYPE_A) {
            Ok(Self::A)
        } else if value.eq_ignore_ascii_case(RECORD_TYPE_AAAA) {
            Ok(Self::Aaaa)
        } else if value.eq_ignore_ascii_case(RECORD_TYPE_DUAL) {
            Ok(Self::Dual)
        } else {
            Err(Error::UnsupportedRecordType {
                value: value.to_string(),
            })
        }
    }

    /// Record kinds this type produces, IPv4 first.
    #[must_use]
    pub fn kinds(self) -> &'static [RecordKind] {
        match self {
            Self::A => &[RecordKind::A],
            Self::Aaaa => &[RecordKind::Aaaa],
            Self::Dual => &[RecordKind::A, RecordKind::Aaaa],
        }
    }

    /// Annotation value of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => RECORD_TYPE_A,
            Self::Aaaa => RECORD_TYPE_AAAA,
            Self::Dual => RECORD_TYPE_DUAL,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record TTL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// Provider-chosen TTL
    #[default]
    Auto,
    /// Explicit TTL in seconds, always greater than 1
    Seconds(u32),
}

impl Ttl {
    /// Parse a `ttl` value. Never fails: empty, `auto`, unparsable and
    /// too-small values all become [`Ttl::Auto`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(TTL_AUTO) {
            return Self::Auto;
        }

        match value.parse::<u32>() {
            Ok(seconds) => Self::from_seconds(seconds),
            Err(e) => {
                warn!(ttl = value, error = %e, "Invalid TTL annotation, using auto");
                Self::Auto
            }
        }
    }

    /// TTL from a provider wire value.
    #[must_use]
    pub fn from_seconds(seconds: u32) -> Self {
        if seconds <= AUTO_TTL {
            Self::Auto
        } else {
            Self::Seconds(seconds)
        }
    }

    /// Value sent to the provider, where 1 means automatic.
    #[must_use]
    pub fn wire_value(self) -> u32 {
        match self {
            Self::Auto => AUTO_TTL,
            Self::Seconds(seconds) => seconds,
        }
    }
}

/// Normalized DNS intent of a managed route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteIntent {
    /// Source of record content
    pub content_mode: ContentMode,
    /// Requested record type
    pub record_type: RecordType,
    /// Zone holding the record (last two labels of `record_name`)
    pub zone_name: String,
    /// Record name (first route hostname)
    pub record_name: String,
    /// Record TTL
    pub ttl: Ttl,
    /// Whether the provider proxies traffic for the record
    pub proxied: bool,
}

/// Extract the DNS intent of a route.
///
/// Returns `Ok(None)` when the route carries no (or an empty) `content-mode`
/// annotation under `prefix`, meaning the route is not managed.
///
/// # Errors
///
/// Returns a per-route error if the route is malformed, names an unsupported
/// content mode or record type, has no hostname, or its hostname yields no zone.
pub fn extract(prefix: &str, route: &HTTPRoute) -> Result<Option<RouteIntent>> {
    let key = route.key()?;
    extract_from(prefix, &key, &route.annotation_map(), &route.spec.hostnames)
}

/// Extract an intent from raw route parts.
///
/// # Errors
///
/// See [`extract`].
pub fn extract_from(
    prefix: &str,
    route: &RouteKey,
    annotations: &BTreeMap<String, String>,
    hostnames: &[String],
) -> Result<Option<RouteIntent>> {
    let scoped: BTreeMap<&str, &str> = annotations
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(prefix)
                .map(|stripped| (stripped, value.as_str()))
        })
        .collect();

    let Some(mode) = scoped
        .get(CONTENT_MODE)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
    else {
        return Ok(None);
    };
    let content_mode = ContentMode::parse(mode)?;

    let record_type = match scoped.get(RECORD_TYPE) {
        Some(value) if !value.trim().is_empty() => RecordType::parse(value)?,
        _ => RecordType::default(),
    };

    let record_name = hostnames
        .first()
        .map(|hostname| hostname.trim().trim_end_matches('.'))
        .filter(|hostname| !hostname.is_empty())
        .ok_or_else(|| Error::NoHostname {
            route: route.to_string(),
        })?
        .to_string();
    let zone_name = derive_zone(&record_name)?;

    let ttl = scoped.get(TTL).map_or(Ttl::Auto, |value| Ttl::parse(value));
    let proxied = scoped
        .get(PROXIED)
        .is_some_and(|value| parse_proxied(route, value));

    Ok(Some(RouteIntent {
        content_mode,
        record_type,
        zone_name,
        record_name,
        ttl,
        proxied,
    }))
}

/// Derive the zone of a record name: its last two labels.
///
/// # Errors
///
/// Returns `InvalidZoneDerivation` if the name has fewer than two labels or
/// an empty label.
pub fn derive_zone(record_name: &str) -> Result<String> {
    let labels: Vec<&str> = record_name.trim_end_matches('.').split('.').collect();

    if labels.len() < MIN_RECORD_LABELS || labels.iter().any(|label| label.is_empty()) {
        return Err(Error::InvalidZoneDerivation {
            record_name: record_name.to_string(),
        });
    }

    Ok(labels[labels.len() - ZONE_LABELS..].join("."))
}

fn parse_proxied(route: &RouteKey, value: &str) -> bool {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        true
    } else if value.eq_ignore_ascii_case("false") || value.is_empty() {
        false
    } else {
        warn!(route = %route, proxied = value, "Invalid proxied annotation, using false");
        false
    }
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod intent_tests;
