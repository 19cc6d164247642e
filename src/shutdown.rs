// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process-wide shutdown broadcast.
//!
//! A `tokio::sync::watch` boolean: `false` while running, `true` once
//! shutdown was requested. Every driver holds a receiver.

use tokio::sync::watch;
use tracing::{error, info};

/// Create the shutdown broadcast in the running state.
#[must_use]
pub fn channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolve once shutdown was requested.
///
/// A dropped sender counts as a request.
pub async fn requested(rx: &mut watch::Receiver<bool>) {
    // Err means the sender is gone, which is also a stop.
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Resolve on SIGINT or SIGTERM.
pub async fn signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
        info!("Received SIGINT");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
