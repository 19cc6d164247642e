// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateway address selection for gateway-address content mode.
//!
//! Candidates are the entries of `Gateway.status.addresses` whose value is an
//! IP literal and whose type, when set, is `IPAddress`; hostname-typed entries
//! never produce address records. The first
//! candidate of each requested family wins, IPv4 before IPv6.

use crate::constants::GATEWAY_ADDRESS_TYPE_IP;
use crate::crd::Gateway;
use crate::errors::{Error, Result};
use crate::intent::{RecordKind, RecordType};
use std::net::IpAddr;
use tracing::debug;

/// Select the addresses of `gateway` for `record_type`.
///
/// # Errors
///
/// Returns `NoMatchingAddress` if the gateway exposes no IP literal of any
/// requested family.
pub fn addresses_for(gateway: &Gateway, record_type: RecordType) -> Result<Vec<IpAddr>> {
    let candidates: Vec<IpAddr> = gateway
        .status_addresses()
        .iter()
        .filter(|address| {
            address
                .address_type
                .as_deref()
                .is_none_or(|kind| kind == GATEWAY_ADDRESS_TYPE_IP)
        })
        .filter_map(|address| match address.value.trim().parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                debug!(
                    gateway = %gateway.display_name(),
                    value = %address.value,
                    "Skipping non-IP gateway address"
                );
                None
            }
        })
        .collect();

    let selected: Vec<IpAddr> = record_type
        .kinds()
        .iter()
        .filter_map(|kind| first_of_kind(&candidates, *kind))
        .collect();

    if selected.is_empty() {
        return Err(Error::NoMatchingAddress {
            gateway: gateway.display_name(),
            record_type: record_type.to_string(),
        });
    }

    Ok(selected)
}

/// First address of `kind`'s family in `addresses`.
#[must_use]
pub fn first_of_kind(addresses: &[IpAddr], kind: RecordKind) -> Option<IpAddr> {
    addresses.iter().copied().find(|ip| kind.matches(ip))
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod gateway_tests;
