// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller configuration.
//!
//! Every setting is a command-line flag that can also be set through an
//! environment variable (`--record-owner-id` / `RECORD_OWNER_ID`, ...).
//! [`Config::validate`] must pass before anything is started.

use crate::constants::{
    CLOUDFLARE_API_BASE, DEFAULT_ANNOTATION_PREFIX, DEFAULT_HEALTH_ADDR, DEFAULT_IPV4_LOOKUP_URL,
    DEFAULT_IPV6_LOOKUP_URL, DEFAULT_LOOKUP_TIMEOUT_SECS, DEFAULT_PROVIDER_TIMEOUT_SECS,
    DEFAULT_RECORD_OWNER_ID, DEFAULT_SHUTDOWN_TIMEOUT_SECS, DEFAULT_SWEEP_INTERVAL_SECS,
    DEFAULT_WATCH_RECONNECT_DELAY_SECS,
};
use crate::errors::{Error, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// What the controller may do to provider records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Create, update and delete records
    #[default]
    Full,
    /// Create and update records, never delete them
    UpsertOnly,
}

impl Strategy {
    /// True if route deletions remove provider records.
    #[must_use]
    pub fn deletes_records(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Command-line and environment configuration.
#[derive(Clone, Parser)]
#[command(
    name = "routedns",
    version,
    about = "Keeps Cloudflare DNS records in sync with Gateway API HTTPRoutes"
)]
pub struct Config {
    /// Cloudflare API token with Zone:DNS:Edit permission
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub cloudflare_api_token: String,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_URL", default_value = CLOUDFLARE_API_BASE)]
    pub cloudflare_api_url: String,

    /// Record management strategy
    #[arg(long, env = "STRATEGY", value_enum, default_value_t = Strategy::Full)]
    pub strategy: Strategy,

    /// Owner marker written on managed records
    #[arg(long, env = "RECORD_OWNER_ID", default_value = DEFAULT_RECORD_OWNER_ID)]
    pub record_owner_id: String,

    /// Prefix of the route annotations carrying DNS intent
    #[arg(long, env = "ANNOTATION_PREFIX", default_value = DEFAULT_ANNOTATION_PREFIX)]
    pub annotation_prefix: String,

    /// Seconds between periodic sweeps of tracked routes
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL_SECS)]
    pub sweep_interval_secs: u64,

    /// Seconds to wait before restarting a closed route watch
    #[arg(long, env = "WATCH_RECONNECT_DELAY_SECS", default_value_t = DEFAULT_WATCH_RECONNECT_DELAY_SECS)]
    pub watch_reconnect_delay_secs: u64,

    /// IPv4 public address lookup endpoint
    #[arg(long, env = "IPV4_LOOKUP_URL", default_value = DEFAULT_IPV4_LOOKUP_URL)]
    pub ipv4_lookup_url: String,

    /// IPv6 public address lookup endpoint
    #[arg(long, env = "IPV6_LOOKUP_URL", default_value = DEFAULT_IPV6_LOOKUP_URL)]
    pub ipv6_lookup_url: String,

    /// Timeout of a single public address lookup, in seconds
    #[arg(long, env = "LOOKUP_TIMEOUT_SECS", default_value_t = DEFAULT_LOOKUP_TIMEOUT_SECS)]
    pub lookup_timeout_secs: u64,

    /// Timeout of a single Cloudflare API request, in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = DEFAULT_PROVIDER_TIMEOUT_SECS)]
    pub provider_timeout_secs: u64,

    /// Bind address of the liveness and metrics server
    #[arg(long, env = "HEALTH_ADDR", default_value = DEFAULT_HEALTH_ADDR)]
    pub health_addr: SocketAddr,

    /// Seconds in-flight work may take to finish on shutdown
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cloudflare_api_token", &"<REDACTED>")
            .field("cloudflare_api_url", &self.cloudflare_api_url)
            .field("strategy", &self.strategy)
            .field("record_owner_id", &self.record_owner_id)
            .field("annotation_prefix", &self.annotation_prefix)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("watch_reconnect_delay_secs", &self.watch_reconnect_delay_secs)
            .field("ipv4_lookup_url", &self.ipv4_lookup_url)
            .field("ipv6_lookup_url", &self.ipv6_lookup_url)
            .field("lookup_timeout_secs", &self.lookup_timeout_secs)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("health_addr", &self.health_addr)
            .field("shutdown_timeout_secs", &self.shutdown_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Check the configuration for values the controller cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.cloudflare_api_token.trim().is_empty() {
            return Err(Error::config("cloudflare-api-token must not be empty"));
        }
        if self.record_owner_id.trim().is_empty() {
            return Err(Error::config("record-owner-id must not be empty"));
        }
        if self.annotation_prefix.len() < 2 || !self.annotation_prefix.ends_with('/') {
            return Err(Error::config(format!(
                "annotation-prefix '{}' must be a non-empty prefix ending with '/'",
                self.annotation_prefix
            )));
        }

        for (name, value) in [
            ("sweep-interval-secs", self.sweep_interval_secs),
            ("watch-reconnect-delay-secs", self.watch_reconnect_delay_secs),
            ("lookup-timeout-secs", self.lookup_timeout_secs),
            ("provider-timeout-secs", self.provider_timeout_secs),
            ("shutdown-timeout-secs", self.shutdown_timeout_secs),
        ] {
            if value == 0 {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }

        for (name, value) in [
            ("cloudflare-api-url", &self.cloudflare_api_url),
            ("ipv4-lookup-url", &self.ipv4_lookup_url),
            ("ipv6-lookup-url", &self.ipv6_lookup_url),
        ] {
            let url = Url::parse(value)
                .map_err(|e| Error::config(format!("{name} '{value}' is not a valid URL: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "{name} '{value}' must use http or https"
                )));
            }
        }

        Ok(())
    }

    /// Interval between periodic sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Delay before restarting a closed watch.
    #[must_use]
    pub fn watch_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.watch_reconnect_delay_secs)
    }

    /// Timeout of one public address lookup.
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// Timeout of one provider request.
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Graceful shutdown budget.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
