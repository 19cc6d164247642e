// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the health server.

#[cfg(test)]
mod tests {
    use crate::health::serve;
    use crate::metrics::record_reconciliation;
    use crate::shutdown;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_healthz_and_metrics() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stop_rx) = shutdown::channel();
        let server = tokio::spawn(serve(listener, stop_rx));

        let healthz = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
        assert_eq!(healthz.status(), 200);
        assert_eq!(healthz.text().await.unwrap(), "OK");

        record_reconciliation("health-test", "applied", Duration::from_millis(5));
        let metrics = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
        assert_eq!(metrics.status(), 200);
        assert!(metrics
            .text()
            .await
            .unwrap()
            .contains("routedns_reconciliations_total"));

        let missing = reqwest::get(format!("http://{addr}/nope")).await.unwrap();
        assert_eq!(missing.status(), 404);

        stop.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
