// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Liveness and metrics HTTP server.
//!
//! - `GET /healthz` always answers `200 OK` with body `OK`
//! - `GET /metrics` answers the Prometheus text exposition

use crate::constants::{HEALTHZ_PATH, METRICS_PATH};
use crate::metrics::gather_metrics;
use crate::shutdown;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Router of the health server.
pub fn router() -> Router {
    Router::new()
        .route(HEALTHZ_PATH, get(healthz))
        .route(METRICS_PATH, get(metrics))
}

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics() -> Response {
    match gather_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve on `listener` until shutdown is requested.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(listener: TcpListener, mut stop: watch::Receiver<bool>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Health server listening");
    }
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown::requested(&mut stop).await })
        .await
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod health_tests;
