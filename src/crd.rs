// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed Gateway API resources read by the controller.
//!
//! routedns does not own any Custom Resource Definitions. It reads two
//! resources of the Kubernetes Gateway API (`gateway.networking.k8s.io/v1`):
//!
//! - [`HTTPRoute`] - carries the DNS intent in its annotations, the record
//!   name in `spec.hostnames` and the parent gateway in `spec.parentRefs`
//! - [`Gateway`] - exposes the addresses used in gateway-address mode in
//!   `status.addresses`
//!
//! Only the fields the controller needs are modelled; everything else in the
//! objects is ignored during deserialization.
//!
//! # Example
//!
//! ```rust
//! use routedns::crd::{HTTPRoute, HTTPRouteSpec, ParentReference};
//!
//! let mut route = HTTPRoute::new(
//!     "app1",
//!     HTTPRouteSpec {
//!         hostnames: vec!["api.example.com".to_string()],
//!         parent_refs: vec![ParentReference {
//!             name: "public".to_string(),
//!             ..ParentReference::default()
//!         }],
//!     },
//! );
//! route.metadata.namespace = Some("web".to_string());
//!
//! let key = route.key().unwrap();
//! assert_eq!(key.to_string(), "web/app1");
//! assert_eq!(route.first_hostname(), Some("api.example.com"));
//! ```

use crate::constants::{GATEWAY_API_GROUP, KIND_GATEWAY, KIND_HTTP_ROUTE};
use crate::errors::{Error, Result};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a route inside the cluster, keyed by `(namespace, name)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    /// Route namespace
    pub namespace: String,
    /// Route name
    pub name: String,
}

impl RouteKey {
    /// Create a route key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Identity of the Gateway a route is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GatewayRef {
    /// Gateway namespace
    pub namespace: String,
    /// Gateway name
    pub name: String,
}

impl fmt::Display for GatewayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Reference from a route to its parent resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    /// API group of the parent (defaults to the Gateway API group)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Kind of the parent (defaults to `Gateway`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Name of the parent
    pub name: String,

    /// Namespace of the parent; the route's namespace when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Listener name on the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
}

/// `HTTPRoute` routes HTTP traffic for a set of hostnames through a parent Gateway.
///
/// # Example
///
/// ```yaml
/// apiVersion: gateway.networking.k8s.io/v1
/// kind: HTTPRoute
/// metadata:
///   name: app1
///   namespace: web
///   annotations:
///     routedns/content-mode: gateway-address
///     routedns/type: A
/// spec:
///   hostnames:
///     - api.example.com
///   parentRefs:
///     - name: public
///       namespace: gateways
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1",
    kind = "HTTPRoute",
    namespaced,
    doc = "HTTPRoute as defined by the Kubernetes Gateway API. Only hostnames and parentRefs are read."
)]
#[serde(rename_all = "camelCase")]
pub struct HTTPRouteSpec {
    /// Hostnames served by the route. The first one becomes the DNS record name.
    #[serde(default)]
    pub hostnames: Vec<String>,

    /// Parent resources the route attaches to. Only the first one is used.
    #[serde(default)]
    pub parent_refs: Vec<ParentReference>,
}

impl HTTPRoute {
    /// Identity of this route.
    ///
    /// # Errors
    ///
    /// Returns `MalformedObject` if `metadata.name` or `metadata.namespace` is missing.
    pub fn key(&self) -> Result<RouteKey> {
        let name = self.metadata.name.clone().ok_or_else(|| {
            Error::malformed(KIND_HTTP_ROUTE, "<unnamed>", "missing metadata.name")
        })?;
        let namespace = self.namespace().ok_or_else(|| {
            Error::malformed(KIND_HTTP_ROUTE, name.clone(), "missing metadata.namespace")
        })?;
        Ok(RouteKey { namespace, name })
    }

    /// First declared hostname, if any.
    #[must_use]
    pub fn first_hostname(&self) -> Option<&str> {
        self.spec
            .hostnames
            .first()
            .map(String::as_str)
            .filter(|hostname| !hostname.is_empty())
    }

    /// Annotations of the route (empty when none are set).
    #[must_use]
    pub fn annotation_map(&self) -> BTreeMap<String, String> {
        self.metadata.annotations.clone().unwrap_or_default()
    }

    /// Gateway referenced by the first parent reference.
    ///
    /// The gateway namespace defaults to the route namespace.
    ///
    /// # Errors
    ///
    /// Returns `MalformedObject` if the route has no parent reference, the
    /// first reference has an empty name, or the route itself has no identity.
    pub fn gateway_ref(&self) -> Result<GatewayRef> {
        let key = self.key()?;
        let parent = self.spec.parent_refs.first().ok_or_else(|| {
            Error::malformed(KIND_HTTP_ROUTE, key.to_string(), "no spec.parentRefs")
        })?;

        let group = parent.group.as_deref().unwrap_or(GATEWAY_API_GROUP);
        let kind = parent.kind.as_deref().unwrap_or(KIND_GATEWAY);
        if group != GATEWAY_API_GROUP || kind != KIND_GATEWAY {
            return Err(Error::malformed(
                KIND_HTTP_ROUTE,
                key.to_string(),
                format!("first parentRef is a {group}/{kind}, not a Gateway"),
            ));
        }

        if parent.name.is_empty() {
            return Err(Error::malformed(
                KIND_HTTP_ROUTE,
                key.to_string(),
                "first parentRef has no name",
            ));
        }

        Ok(GatewayRef {
            namespace: parent
                .namespace
                .clone()
                .filter(|ns| !ns.is_empty())
                .unwrap_or(key.namespace),
            name: parent.name.clone(),
        })
    }
}

/// One entry of `Gateway.status.addresses`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatusAddress {
    /// Address type (`IPAddress`, `Hostname`, ...). Optional in the API.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,

    /// Address value
    pub value: String,
}

/// Observed state of a Gateway.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    /// Addresses the Gateway is reachable on
    #[serde(default)]
    pub addresses: Vec<GatewayStatusAddress>,
}

/// `Gateway` as defined by the Kubernetes Gateway API.
///
/// Only `status.addresses` is read, in gateway-address content mode.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1",
    kind = "Gateway",
    namespaced,
    doc = "Gateway as defined by the Kubernetes Gateway API. Only status.addresses is read."
)]
#[kube(status = "GatewayStatus")]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    /// Name of the `GatewayClass` implementing this Gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_class_name: Option<String>,
}

impl Gateway {
    /// Identity of this gateway, for logs and errors.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{}/{}",
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }

    /// Status addresses, empty when the Gateway has no status yet.
    #[must_use]
    pub fn status_addresses(&self) -> &[GatewayStatusAddress] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.addresses.as_slice())
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
