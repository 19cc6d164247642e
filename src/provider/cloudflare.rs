// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare API v4 implementation of [`DnsProvider`].
//!
//! # API calls
//!
//! ```http
//! GET    /zones?name=example.com
//! GET    /zones/:zone_id/dns_records?name=api.example.com&type=A
//! POST   /zones/:zone_id/dns_records
//! PUT    /zones/:zone_id/dns_records/:record_id
//! DELETE /zones/:zone_id/dns_records/:record_id
//! ```
//!
//! The owner marker is stored in the record `comment` field.
//!
//! # Error mapping
//!
//! - 401, 403 and other 4xx answers → [`Error::Provider`] (not retried)
//! - 429, 5xx and transport failures → [`Error::Connectivity`]
//!
//! The API token never appears in logs, errors or `Debug` output.

use super::{DnsProvider, DnsRecord};
use crate::errors::{Error, Result};
use crate::intent::RecordKind;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const TARGET: &str = "cloudflare";

/// Cloudflare DNS provider.
pub struct CloudflareProvider {
    /// API token; never log this value
    api_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Cloudflare response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

/// DNS record as exchanged with the API.
#[derive(Debug, Serialize, Deserialize)]
struct ApiRecord {
    #[serde(default, skip_serializing)]
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    ttl: u32,
    #[serde(default)]
    proxied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl ApiRecord {
    fn from_record(record: &DnsRecord) -> Self {
        Self {
            id: String::new(),
            record_type: record.kind.as_str().to_string(),
            name: record.name.clone(),
            content: record.content.clone(),
            ttl: record.ttl,
            proxied: record.proxied,
            comment: Some(record.owner.clone()).filter(|owner| !owner.is_empty()),
        }
    }

    fn into_record(self) -> Option<DnsRecord> {
        let kind = RecordKind::from_type_name(&self.record_type)?;
        Some(DnsRecord {
            id: self.id,
            kind,
            name: self.name,
            content: self.content,
            ttl: self.ttl,
            proxied: self.proxied,
            owner: self.comment.unwrap_or_default(),
        })
    }
}

impl CloudflareProvider {
    /// Create a provider against `base_url` (normally the public API v4 root).
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the token is empty, the base URL does not
    /// parse, or the HTTP client cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| Error::config(format!("invalid Cloudflare API URL {base_url}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("cannot build Cloudflare HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            base_url,
            client,
        })
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| Error::config(format!("invalid Cloudflare URL for {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&ApiRecord>,
    ) -> Result<T> {
        debug!(method = %method, path = %url.path(), "Cloudflare API request");

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.api_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::connectivity(TARGET, e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::connectivity(TARGET, format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(map_status(status, &text));
        }

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| Error::Provider {
            status: status.as_u16(),
            message: format!("unexpected response: {e}"),
        })?;

        if !envelope.success {
            return Err(Error::Provider {
                status: status.as_u16(),
                message: join_messages(&envelope.errors),
            });
        }

        envelope.result.ok_or_else(|| Error::Provider {
            status: status.as_u16(),
            message: "response has no result".to_string(),
        })
    }
}

fn join_messages(messages: &[ApiMessage]) -> String {
    if messages.is_empty() {
        return "request failed".to_string();
    }
    messages
        .iter()
        .map(|m| format!("{} ({})", m.message, m.code))
        .collect::<Vec<_>>()
        .join("; ")
}

fn map_status(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .map(|envelope| join_messages(&envelope.errors))
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());

    match status.as_u16() {
        429 | 500..=599 => Error::connectivity(TARGET, format!("HTTP {status}: {message}")),
        code => Error::Provider {
            status: code,
            message,
        },
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn zone_id(&self, zone_name: &str) -> Result<String> {
        let url = self.url("/zones", &[("name", zone_name)])?;
        let zones: Vec<Zone> = self.call(Method::GET, url, None).await?;

        zones
            .into_iter()
            .next()
            .map(|zone| zone.id)
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
        let url = self.url(
            &format!("/zones/{zone_id}/dns_records"),
            &[("name", name), ("type", kind.as_str())],
        )?;
        let records: Vec<ApiRecord> = self.call(Method::GET, url, None).await?;

        Ok(records
            .into_iter()
            .filter_map(ApiRecord::into_record)
            .collect())
    }

    async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records"), &[])?;
        let created: ApiRecord = self
            .call(Method::POST, url, Some(&ApiRecord::from_record(record)))
            .await?;
        created.into_record().ok_or_else(|| Error::Provider {
            status: 200,
            message: "created record has an unexpected type".to_string(),
        })
    }

    async fn update_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records/{}", record.id), &[])?;
        let updated: ApiRecord = self
            .call(Method::PUT, url, Some(&ApiRecord::from_record(record)))
            .await?;
        updated.into_record().ok_or_else(|| Error::Provider {
            status: 200,
            message: "updated record has an unexpected type".to_string(),
        })
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records/{record_id}"), &[])?;
        let _: serde_json::Value = self.call(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
