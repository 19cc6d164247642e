// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for routedns.
//!
//! A single [`Error`] enum covers every failure the controller distinguishes:
//! - Configuration errors that prevent startup
//! - Connectivity errors against the cluster API, the DNS provider or the
//!   public address lookup services
//! - Ownership conflicts on provider-side records
//! - Per-route errors (missing hostname, unusable zone, no address) that skip
//!   a single route and leave tracked state untouched
//!
//! [`Error::is_transient`] tells drivers whether a later trigger can be
//! expected to succeed, and [`Error::reason`] gives a stable label for metrics
//! and logs.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while reconciling routes against the DNS provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid configuration; the process cannot start.
    #[error("Invalid configuration: {reason}")]
    ConfigInvalid {
        /// Explanation of what is invalid
        reason: String,
    },

    /// The cluster API, the DNS provider or a lookup service could not be reached.
    ///
    /// Never fatal. The driver that triggered the operation retries on its next
    /// reconnect or sweep.
    #[error("Connectivity error talking to {target}: {reason}")]
    Connectivity {
        /// Which collaborator failed (e.g. "kubernetes", "cloudflare", a lookup URL)
        target: String,
        /// Underlying failure
        reason: String,
    },

    /// A provider-side record belongs to a different owner.
    ///
    /// The operation is abandoned for that record only and nothing is mutated.
    #[error(
        "Record ownership conflict for {record_type} record '{name}': owned by '{existing_owner}', expected '{expected_owner}'"
    )]
    OwnershipConflict {
        /// Record name
        name: String,
        /// Record type (`A` or `AAAA`)
        record_type: String,
        /// Owner marker found on the provider-side record
        existing_owner: String,
        /// Owner marker of this controller
        expected_owner: String,
    },

    /// The route declares no hostname to derive a record name from.
    #[error("Route {route} has no hostnames in spec")]
    NoHostname {
        /// Route identity (`namespace/name`)
        route: String,
    },

    /// A zone could not be derived from the record name.
    #[error("Cannot derive a zone from record name '{record_name}'")]
    InvalidZoneDerivation {
        /// The offending record name
        record_name: String,
    },

    /// Every requested public address lookup failed.
    #[error("No public address detected for record type {record_type}")]
    NoAddressDetected {
        /// Requested record type (`A`, `AAAA`, `A/AAAA`)
        record_type: String,
    },

    /// The `type` annotation holds an unsupported record type.
    #[error("Unsupported record type '{value}'")]
    UnsupportedRecordType {
        /// Raw annotation value
        value: String,
    },

    /// The `content-mode` annotation holds an unsupported mode.
    #[error("Unsupported content mode '{value}'")]
    UnsupportedContentMode {
        /// Raw annotation value
        value: String,
    },

    /// A cluster object lacks a field the controller requires.
    #[error("Malformed {kind} {object}: {reason}")]
    MalformedObject {
        /// Object kind (`HTTPRoute`, `Gateway`)
        kind: String,
        /// Object identity, as far as it is known
        object: String,
        /// Which field is missing or invalid
        reason: String,
    },

    /// The parent Gateway of a route does not exist.
    #[error("Gateway {gateway} not found")]
    GatewayNotFound {
        /// Gateway identity (`namespace/name`)
        gateway: String,
    },

    /// The Gateway exposes no address of the requested family.
    #[error("Gateway {gateway} has no {record_type} address in status.addresses")]
    NoMatchingAddress {
        /// Gateway identity (`namespace/name`)
        gateway: String,
        /// Requested record type
        record_type: String,
    },

    /// None of the resolved addresses fits the record type to be written.
    #[error("No {record_type} address among the resolved addresses for record '{record}'")]
    NoAddressForRecord {
        /// Record name
        record: String,
        /// Requested record type
        record_type: String,
    },

    /// The provider has no zone with the given name.
    #[error("Zone '{zone}' not found at DNS provider")]
    ZoneNotFound {
        /// Zone name
        zone: String,
    },

    /// The provider rejected a request for a non-transient reason.
    #[error("DNS provider rejected request ({status}): {message}")]
    Provider {
        /// HTTP status code returned by the provider
        status: u16,
        /// Provider error message
        message: String,
    },
}

impl Error {
    /// Build a connectivity error for a named collaborator.
    pub fn connectivity(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connectivity {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            reason: reason.into(),
        }
    }

    /// Build a malformed-object error.
    pub fn malformed(
        kind: impl Into<String>,
        object: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedObject {
            kind: kind.into(),
            object: object.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error is transient and a later trigger may succeed
    /// without any change to the route.
    ///
    /// Transient errors include network failures, timeouts, rate limiting and
    /// provider 5xx answers. Ownership conflicts and invalid route data are
    /// permanent until someone edits the record or the route.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connectivity { .. } | Self::NoAddressDetected { .. } => true,
            Self::Provider { status, .. } => *status == 429 || (500..600).contains(status),
            Self::ConfigInvalid { .. }
            | Self::OwnershipConflict { .. }
            | Self::NoHostname { .. }
            | Self::InvalidZoneDerivation { .. }
            | Self::UnsupportedRecordType { .. }
            | Self::UnsupportedContentMode { .. }
            | Self::MalformedObject { .. }
            | Self::GatewayNotFound { .. }
            | Self::NoMatchingAddress { .. }
            | Self::NoAddressForRecord { .. }
            | Self::ZoneNotFound { .. } => false,
        }
    }

    /// Returns a stable reason code for logs and metric labels.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ConfigInvalid { .. } => "ConfigInvalid",
            Self::Connectivity { .. } => "ConnectivityError",
            Self::OwnershipConflict { .. } => "OwnershipConflict",
            Self::NoHostname { .. } => "NoHostname",
            Self::InvalidZoneDerivation { .. } => "InvalidZoneDerivation",
            Self::NoAddressDetected { .. } => "NoAddressDetected",
            Self::UnsupportedRecordType { .. } => "UnsupportedRecordType",
            Self::UnsupportedContentMode { .. } => "UnsupportedContentMode",
            Self::MalformedObject { .. } => "MalformedObject",
            Self::GatewayNotFound { .. } => "GatewayNotFound",
            Self::NoMatchingAddress { .. } => "NoMatchingAddress",
            Self::NoAddressForRecord { .. } => "NoAddressForRecord",
            Self::ZoneNotFound { .. } => "ZoneNotFound",
            Self::Provider { .. } => "ProviderRejected",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
