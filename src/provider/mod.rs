// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership-aware DNS provider adapter.
//!
//! [`DnsProvider`] is the thin contract a DNS backend implements: zone lookup
//! plus list/create/update/delete of address records inside a zone.
//!
//! [`RecordManager`] layers the controller's rules on top of it:
//!
//! - Every record it creates or updates carries the controller's owner marker.
//! - A record whose marker is set to a different owner is never mutated or
//!   deleted ([`Error::OwnershipConflict`]).
//! - An update is only issued when `{type, name, content, ttl, proxied}`
//!   differs from what the provider already holds.
//! - Dual-family intents fan out to one A and one AAAA record, using the first
//!   address of each family.
//!
//! # Example
//!
//! ```rust,no_run
//! use routedns::provider::{memory::InMemoryProvider, RecordManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> routedns::errors::Result<()> {
//! let provider = Arc::new(InMemoryProvider::new());
//! provider.add_zone("example.com");
//!
//! let records = RecordManager::new(provider, "routedns");
//! let zone_id = records.zone_id("example.com").await?;
//! let existing = records
//!     .find_record(&zone_id, "api.example.com", routedns::intent::RecordKind::A)
//!     .await?;
//! assert!(existing.is_none());
//! # Ok(())
//! # }
//! ```

pub mod cloudflare;
pub mod memory;

use crate::errors::{Error, Result};
use crate::intent::{RecordKind, RouteIntent, Ttl};
use crate::metrics;
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An address record as held by the DNS provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-assigned identifier (empty for records not yet created)
    pub id: String,
    /// Record kind
    pub kind: RecordKind,
    /// Fully qualified record name
    pub name: String,
    /// Record content (an IP literal)
    pub content: String,
    /// TTL wire value (1 means automatic)
    pub ttl: u32,
    /// Whether the provider proxies traffic
    pub proxied: bool,
    /// Owner marker (empty when unowned)
    pub owner: String,
}

impl DnsRecord {
    /// Desired record for `address`, not yet bound to a provider id.
    #[must_use]
    pub fn desired(name: &str, address: IpAddr, ttl: Ttl, proxied: bool) -> Self {
        Self {
            id: String::new(),
            kind: RecordKind::of(&address),
            name: name.to_string(),
            content: address.to_string(),
            ttl: ttl.wire_value(),
            proxied,
            owner: String::new(),
        }
    }

    /// True if both records agree on `{type, name, content, ttl, proxied}`.
    ///
    /// The id and the owner marker are not compared.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name.eq_ignore_ascii_case(&other.name)
            && self.content == other.content
            && self.ttl == other.ttl
            && self.proxied == other.proxied
    }
}

/// Contract of a DNS backend, scoped to address records.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve a zone name to the provider's zone id.
    ///
    /// # Errors
    ///
    /// Returns `ZoneNotFound` if the provider has no such zone.
    async fn zone_id(&self, zone_name: &str) -> Result<String>;

    /// List the records of `kind` named `name` in a zone.
    async fn list_records(&self, zone_id: &str, name: &str, kind: RecordKind)
        -> Result<Vec<DnsRecord>>;

    /// Create a record; the `id` of `record` is ignored.
    async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord>;

    /// Replace the record identified by `record.id`.
    async fn update_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord>;

    /// Delete a record by id.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()>;
}

/// Result of an [`RecordManager::upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed; one was created
    Created,
    /// An owned or unowned record differed and was updated
    Updated,
    /// The existing record already matched; nothing was sent
    Unchanged,
}

impl UpsertOutcome {
    /// Metric label of this outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Result of a [`RecordManager::delete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record existed and was deleted
    Deleted,
    /// No record existed at delete time
    NotFound,
}

impl DeleteOutcome {
    /// Metric label of this outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::NotFound => "not_found",
        }
    }
}

/// One attempted single-record operation of a fan-out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt<T> {
    /// Record kind the operation targeted
    pub kind: RecordKind,
    /// Address written (upserts only)
    pub address: Option<IpAddr>,
    /// Operation result
    pub result: Result<T>,
}

/// Per-record results of a fan-out over several record kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FanOutReport<T> {
    /// Attempts in execution order (A before AAAA)
    pub attempts: Vec<Attempt<T>>,
}

impl<T> FanOutReport<T> {
    /// Addresses whose operation succeeded, in attempt order.
    #[must_use]
    pub fn applied_addresses(&self) -> Vec<IpAddr> {
        self.attempts
            .iter()
            .filter(|attempt| attempt.result.is_ok())
            .filter_map(|attempt| attempt.address)
            .collect()
    }

    /// True if at least one attempt was made and all of them failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.attempts.is_empty() && self.attempts.iter().all(|attempt| attempt.result.is_err())
    }

    /// First error among the attempts.
    #[must_use]
    pub fn first_error(&self) -> Option<&Error> {
        self.attempts
            .iter()
            .find_map(|attempt| attempt.result.as_ref().err())
    }
}

/// Ownership-aware record operations on top of a [`DnsProvider`].
#[derive(Clone)]
pub struct RecordManager {
    provider: Arc<dyn DnsProvider>,
    owner: String,
}

impl std::fmt::Debug for RecordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordManager")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl RecordManager {
    /// Create a manager writing `owner` as the owner marker.
    pub fn new(provider: Arc<dyn DnsProvider>, owner: impl Into<String>) -> Self {
        Self {
            provider,
            owner: owner.into(),
        }
    }

    /// Owner marker of this controller.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Resolve a zone name to its provider id.
    ///
    /// # Errors
    ///
    /// Propagates provider errors, including `ZoneNotFound`.
    pub async fn zone_id(&self, zone_name: &str) -> Result<String> {
        self.provider.zone_id(zone_name).await
    }

    /// Find the first record of `kind` named `name`. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Propagates provider errors.
    pub async fn find_record(
        &self,
        zone_id: &str,
        name: &str,
        kind: RecordKind,
    ) -> Result<Option<DnsRecord>> {
        let records = self.provider.list_records(zone_id, name, kind).await?;
        Ok(records
            .into_iter()
            .find(|record| record.kind == kind && record.name.eq_ignore_ascii_case(name)))
    }

    /// Create or update the record described by `desired`.
    ///
    /// # Errors
    ///
    /// Returns `OwnershipConflict` if the existing record belongs to another
    /// owner (nothing is changed), or a provider error.
    pub async fn upsert(&self, zone_id: &str, desired: &DnsRecord) -> Result<UpsertOutcome> {
        let existing = self
            .find_record(zone_id, &desired.name, desired.kind)
            .await?;

        let Some(existing) = existing else {
            let record = DnsRecord {
                owner: self.owner.clone(),
                ..desired.clone()
            };
            self.provider.create_record(zone_id, &record).await?;
            info!(
                record = %desired.name,
                record_type = %desired.kind,
                content = %desired.content,
                "Created DNS record"
            );
            return Ok(UpsertOutcome::Created);
        };

        self.check_ownership(&existing)?;

        if existing.same_content(desired) {
            debug!(
                record = %desired.name,
                record_type = %desired.kind,
                "DNS record already up to date"
            );
            return Ok(UpsertOutcome::Unchanged);
        }

        let record = DnsRecord {
            id: existing.id.clone(),
            owner: self.owner.clone(),
            ..desired.clone()
        };
        self.provider.update_record(zone_id, &record).await?;
        info!(
            record = %desired.name,
            record_type = %desired.kind,
            old_content = %existing.content,
            content = %desired.content,
            "Updated DNS record"
        );
        Ok(UpsertOutcome::Updated)
    }

    /// Delete the record of `kind` named `name`, re-resolving it first.
    ///
    /// # Errors
    ///
    /// Returns `OwnershipConflict` if the record belongs to another owner
    /// (nothing is deleted), or a provider error.
    pub async fn delete(&self, zone_id: &str, name: &str, kind: RecordKind) -> Result<DeleteOutcome> {
        let Some(existing) = self.find_record(zone_id, name, kind).await? else {
            debug!(record = %name, record_type = %kind, "DNS record already absent");
            return Ok(DeleteOutcome::NotFound);
        };

        self.check_ownership(&existing)?;

        self.provider.delete_record(zone_id, &existing.id).await?;
        info!(record = %name, record_type = %kind, "Deleted DNS record");
        Ok(DeleteOutcome::Deleted)
    }

    /// Upsert the records of `intent` from a resolved address list.
    ///
    /// Addresses are classified by family; the first address of each family
    /// the intent requests is upserted, and iteration stops once every
    /// requested family has been attempted. A failed attempt is logged and
    /// does not prevent the other family's attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone cannot be resolved, or
    /// `NoAddressForRecord` if no address matches a requested family.
    pub async fn apply_addresses(
        &self,
        intent: &RouteIntent,
        addresses: &[IpAddr],
    ) -> Result<FanOutReport<UpsertOutcome>> {
        let wanted = intent.record_type.kinds();
        let mut attempts: Vec<Attempt<UpsertOutcome>> = Vec::with_capacity(wanted.len());
        let mut zone_id: Option<String> = None;

        for address in addresses {
            let kind = RecordKind::of(address);
            if !wanted.contains(&kind) || attempts.iter().any(|attempt| attempt.kind == kind) {
                continue;
            }

            let zone = match &zone_id {
                Some(zone) => zone.clone(),
                None => {
                    let zone = self.zone_id(&intent.zone_name).await?;
                    zone_id = Some(zone.clone());
                    zone
                }
            };

            let desired =
                DnsRecord::desired(&intent.record_name, *address, intent.ttl, intent.proxied);
            let result = self.upsert(&zone, &desired).await;
            record_attempt("upsert", kind, result.as_ref().map(|outcome| outcome.as_str()));
            if let Err(e) = &result {
                warn!(
                    record = %intent.record_name,
                    record_type = %kind,
                    content = %address,
                    error = %e,
                    "Failed to upsert DNS record"
                );
            }

            attempts.push(Attempt {
                kind,
                address: Some(*address),
                result,
            });

            if attempts.len() == wanted.len() {
                break;
            }
        }

        if attempts.is_empty() {
            return Err(Error::NoAddressForRecord {
                record: intent.record_name.clone(),
                record_type: intent.record_type.to_string(),
            });
        }

        Ok(FanOutReport { attempts })
    }

    /// Delete every record `intent` produces (both kinds for `A/AAAA`).
    ///
    /// # Errors
    ///
    /// Returns an error if the zone cannot be resolved. Per-record failures
    /// are reported in the returned report.
    pub async fn remove_records(&self, intent: &RouteIntent) -> Result<FanOutReport<DeleteOutcome>> {
        let zone_id = self.zone_id(&intent.zone_name).await?;
        let mut attempts = Vec::new();

        for kind in intent.record_type.kinds() {
            let result = self.delete(&zone_id, &intent.record_name, *kind).await;
            record_attempt("delete", *kind, result.as_ref().map(|outcome| outcome.as_str()));
            if let Err(e) = &result {
                warn!(
                    record = %intent.record_name,
                    record_type = %kind,
                    error = %e,
                    "Failed to delete DNS record"
                );
            }
            attempts.push(Attempt {
                kind: *kind,
                address: None,
                result,
            });
        }

        Ok(FanOutReport { attempts })
    }

    fn check_ownership(&self, existing: &DnsRecord) -> Result<()> {
        if existing.owner.is_empty() || existing.owner == self.owner {
            return Ok(());
        }

        Err(Error::OwnershipConflict {
            name: existing.name.clone(),
            record_type: existing.kind.to_string(),
            existing_owner: existing.owner.clone(),
            expected_owner: self.owner.clone(),
        })
    }
}

fn record_attempt(operation: &str, kind: RecordKind, outcome: Result<&str, &Error>) {
    let label = match outcome {
        Ok(outcome) => outcome,
        Err(e) => e.reason(),
    };
    metrics::record_provider_operation(operation, kind.as_str(), label);
}
