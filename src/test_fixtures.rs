// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route and gateway builders shared by unit tests.

use crate::crd::{
    Gateway, GatewaySpec, GatewayStatus, GatewayStatusAddress, HTTPRoute, HTTPRouteSpec,
    ParentReference,
};
use std::collections::BTreeMap;

pub const PREFIX: &str = "routedns/";
pub const NAMESPACE: &str = "web";

/// Route `web/<name>` attached to gateway `web/public`, with `routedns/` annotations.
pub fn route(name: &str, hostname: &str, annotations: &[(&str, &str)]) -> HTTPRoute {
    let mut route = HTTPRoute::new(
        name,
        HTTPRouteSpec {
            hostnames: vec![hostname.to_string()],
            parent_refs: vec![ParentReference {
                name: "public".to_string(),
                ..ParentReference::default()
            }],
        },
    );
    route.metadata.namespace = Some(NAMESPACE.to_string());
    route.metadata.annotations = Some(
        annotations
            .iter()
            .map(|(k, v)| (format!("{PREFIX}{k}"), (*v).to_string()))
            .collect::<BTreeMap<_, _>>(),
    );
    route
}

/// Gateway `web/public` with the given IP status addresses.
pub fn gateway(addresses: &[&str]) -> Gateway {
    let mut gateway = Gateway::new("public", GatewaySpec::default());
    gateway.metadata.namespace = Some(NAMESPACE.to_string());
    gateway.status = Some(GatewayStatus {
        addresses: addresses
            .iter()
            .map(|value| GatewayStatusAddress {
                address_type: Some("IPAddress".to_string()),
                value: (*value).to_string(),
            })
            .collect(),
    });
    gateway
}
