// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`DnsProvider`] with a call log.
//!
//! Backs the test-suite. Every trait call is appended to a log so tests can
//! assert exactly which provider operations happened.

use super::{DnsProvider, DnsRecord};
use crate::errors::{Error, Result};
use crate::intent::RecordKind;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A provider call, as recorded in the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderCall {
    /// `zone_id(zone_name)`
    ZoneId(String),
    /// `list_records(zone_id, name, kind)`
    List {
        /// Zone id
        zone_id: String,
        /// Record name
        name: String,
        /// Record kind
        kind: RecordKind,
    },
    /// `create_record(zone_id, record)`
    Create(DnsRecord),
    /// `update_record(zone_id, record)`
    Update(DnsRecord),
    /// `delete_record(zone_id, record_id)`
    Delete(String),
}

impl ProviderCall {
    /// True for calls that change provider state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Update(_) | Self::Delete(_))
    }
}

#[derive(Default)]
struct State {
    /// zone name -> zone id
    zones: BTreeMap<String, String>,
    /// (zone id, record) pairs
    records: Vec<(String, DnsRecord)>,
    calls: Vec<ProviderCall>,
    failing_kinds: HashSet<RecordKind>,
    unreachable: bool,
}

/// In-memory DNS provider.
#[derive(Default)]
pub struct InMemoryProvider {
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryProvider")
            .field("zones", &state.zones.len())
            .field("records", &state.records.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl InMemoryProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone, returning its id.
    pub fn add_zone(&self, zone_name: &str) -> String {
        let mut state = self.lock();
        let next = state.zones.len() + 1;
        state
            .zones
            .entry(zone_name.to_string())
            .or_insert_with(|| format!("zone-{next}"))
            .clone()
    }

    /// Seed a record in a registered zone without logging a call.
    ///
    /// Returns the id of the stored record.
    ///
    /// # Errors
    ///
    /// Returns `ZoneNotFound` if the zone was never added.
    pub fn seed_record(&self, zone_name: &str, record: DnsRecord) -> Result<String> {
        let id = self.allocate_id();
        let mut state = self.lock();
        let zone_id = state
            .zones
            .get(zone_name)
            .cloned()
            .ok_or_else(|| Error::ZoneNotFound {
                zone: zone_name.to_string(),
            })?;
        state.records.push((zone_id, DnsRecord { id: id.clone(), ..record }));
        Ok(id)
    }

    /// Change the content of stored records in place without logging a call,
    /// the way a manual edit in the provider's dashboard would.
    ///
    /// Returns the number of records changed.
    pub fn edit_content(&self, name: &str, kind: RecordKind, content: &str) -> usize {
        let mut state = self.lock();
        let mut edited = 0;
        for (_, record) in &mut state.records {
            if record.kind == kind && record.name == name {
                record.content = content.to_string();
                edited += 1;
            }
        }
        edited
    }

    /// Every stored record of `kind` named `name`, in any zone.
    #[must_use]
    pub fn records_named(&self, name: &str, kind: RecordKind) -> Vec<DnsRecord> {
        self.lock()
            .records
            .iter()
            .filter(|(_, record)| record.kind == kind && record.name == name)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Every stored record.
    #[must_use]
    pub fn records(&self) -> Vec<DnsRecord> {
        self.lock()
            .records
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// The call log, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    /// Calls that changed provider state.
    #[must_use]
    pub fn mutations(&self) -> Vec<ProviderCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget every logged call.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make every mutation of `kind` fail with a provider error.
    pub fn fail_kind(&self, kind: RecordKind) {
        self.lock().failing_kinds.insert(kind);
    }

    /// Make every call fail with a connectivity error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn begin(&self, call: ProviderCall) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.unreachable {
            return Err(Error::connectivity("memory", "provider unreachable"));
        }
        Ok(state)
    }

    fn check_kind(state: &State, kind: RecordKind) -> Result<()> {
        if state.failing_kinds.contains(&kind) {
            return Err(Error::Provider {
                status: 400,
                message: format!("{kind} mutations rejected"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for InMemoryProvider {
    async fn zone_id(&self, zone_name: &str) -> Result<String> {
        let state = self.begin(ProviderCall::ZoneId(zone_name.to_string()))?;
        state
            .zones
            .get(zone_name)
            .cloned()
            .ok_or_else(|| Error::ZoneNotFound {
                zone: zone_name.to_string(),
            })
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        kind: RecordKind,
    ) -> Result<Vec<DnsRecord>> {
        let state = self.begin(ProviderCall::List {
            zone_id: zone_id.to_string(),
            name: name.to_string(),
            kind,
        })?;
        Ok(state
            .records
            .iter()
            .filter(|(zone, record)| zone == zone_id && record.kind == kind && record.name == name)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let id = self.allocate_id();
        let mut state = self.begin(ProviderCall::Create(record.clone()))?;
        Self::check_kind(&state, record.kind)?;

        let created = DnsRecord {
            id,
            ..record.clone()
        };
        state.records.push((zone_id.to_string(), created.clone()));
        Ok(created)
    }

    async fn update_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let mut state = self.begin(ProviderCall::Update(record.clone()))?;
        Self::check_kind(&state, record.kind)?;

        let slot = state
            .records
            .iter_mut()
            .find(|(zone, existing)| zone == zone_id && existing.id == record.id)
            .ok_or_else(|| Error::Provider {
                status: 404,
                message: format!("record {} not found", record.id),
            })?;
        slot.1 = record.clone();
        Ok(record.clone())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let mut state = self.begin(ProviderCall::Delete(record_id.to_string()))?;

        let position = state
            .records
            .iter()
            .position(|(zone, existing)| zone == zone_id && existing.id == record_id)
            .ok_or_else(|| Error::Provider {
                status: 404,
                message: format!("record {record_id} not found"),
            })?;
        let kind = state.records[position].1.kind;
        Self::check_kind(&state, kind)?;

        state.records.remove(position);
        Ok(())
    }
}
