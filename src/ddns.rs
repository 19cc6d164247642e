// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Public address detection for DDNS content mode.
//!
//! The controller's externally visible address is resolved through plain-text
//! lookup services (one per address family). Each lookup is bounded by a
//! timeout and its answer must be an IP literal of the requested family.
//!
//! For `A/AAAA` both families are looked up concurrently and independently:
//! the result holds whichever succeeded, IPv4 first.

use crate::errors::{Error, Result};
use crate::intent::{RecordKind, RecordType};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A service answering "what is my public address" for one address family.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Look up the public address of `kind`'s family.
    ///
    /// # Errors
    ///
    /// Returns `Connectivity` if the service cannot be reached or answers
    /// with anything but an address of the requested family.
    async fn lookup(&self, kind: RecordKind) -> Result<IpAddr>;
}

/// [`AddressLookup`] over HTTP services returning the address as plain text.
#[derive(Clone, Debug)]
pub struct HttpAddressLookup {
    client: reqwest::Client,
    ipv4_url: String,
    ipv6_url: String,
}

impl HttpAddressLookup {
    /// Create a lookup against the given per-family endpoints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the HTTP client cannot be built.
    pub fn new(
        ipv4_url: impl Into<String>,
        ipv6_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("cannot build lookup HTTP client: {e}")))?;

        Ok(Self {
            client,
            ipv4_url: ipv4_url.into(),
            ipv6_url: ipv6_url.into(),
        })
    }

    fn url_for(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::A => &self.ipv4_url,
            RecordKind::Aaaa => &self.ipv6_url,
        }
    }
}

#[async_trait]
impl AddressLookup for HttpAddressLookup {
    async fn lookup(&self, kind: RecordKind) -> Result<IpAddr> {
        let url = self.url_for(kind);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::connectivity(url, e))?;

        if !response.status().is_success() {
            return Err(Error::connectivity(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::connectivity(url, format!("failed to read body: {e}")))?;
        let body = body.trim();

        let address: IpAddr = body
            .parse()
            .map_err(|_| Error::connectivity(url, format!("not an IP address: {body:?}")))?;

        if !kind.matches(&address) {
            return Err(Error::connectivity(
                url,
                format!("expected {} address, got {address}", kind.family()),
            ));
        }

        Ok(address)
    }
}

/// Resolves the public addresses a DDNS route should point at.
#[derive(Clone)]
pub struct PublicAddressDetector {
    lookup: Arc<dyn AddressLookup>,
}

impl PublicAddressDetector {
    /// Create a detector over a lookup service.
    pub fn new(lookup: Arc<dyn AddressLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve the public addresses for `record_type`.
    ///
    /// # Errors
    ///
    /// Returns `NoAddressDetected` only when every requested family failed.
    pub async fn resolve(&self, record_type: RecordType) -> Result<Vec<IpAddr>> {
        let lookups = record_type
            .kinds()
            .iter()
            .map(|kind| self.lookup_one(*kind));
        let results = futures::future::join_all(lookups).await;

        let addresses: Vec<IpAddr> = results.into_iter().flatten().collect();
        if addresses.is_empty() {
            return Err(Error::NoAddressDetected {
                record_type: record_type.to_string(),
            });
        }

        debug!(record_type = %record_type, addresses = ?addresses, "Detected public addresses");
        Ok(addresses)
    }

    async fn lookup_one(&self, kind: RecordKind) -> Option<IpAddr> {
        match self.lookup.lookup(kind).await {
            Ok(address) => Some(address),
            Err(e) => {
                warn!(family = kind.family(), error = %e, "Public address lookup failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for PublicAddressDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicAddressDetector").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "ddns_tests.rs"]
mod ddns_tests;
