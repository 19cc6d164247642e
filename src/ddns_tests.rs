// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for public address detection.

#[cfg(test)]
mod tests {
    use crate::ddns::*;
    use crate::errors::{Error, Result};
    use crate::intent::{RecordKind, RecordType};
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Lookup answering from fixed per-family results.
    struct FixedLookup {
        v4: Option<IpAddr>,
        v6: Option<IpAddr>,
    }

    #[async_trait]
    impl AddressLookup for FixedLookup {
        async fn lookup(&self, kind: RecordKind) -> Result<IpAddr> {
            let answer = match kind {
                RecordKind::A => self.v4,
                RecordKind::Aaaa => self.v6,
            };
            answer.ok_or_else(|| Error::connectivity("fixed", "no answer"))
        }
    }

    fn detector(v4: Option<&str>, v6: Option<&str>) -> PublicAddressDetector {
        PublicAddressDetector::new(Arc::new(FixedLookup {
            v4: v4.map(|ip| ip.parse().unwrap()),
            v6: v6.map(|ip| ip.parse().unwrap()),
        }))
    }

    async fn lookup_server(route: &str, body: &str, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn http_lookup(server: &MockServer) -> HttpAddressLookup {
        HttpAddressLookup::new(
            format!("{}/v4", server.uri()),
            format!("{}/v6", server.uri()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_http_lookup_trims_body() {
        let server = lookup_server("/v4", "203.0.113.5\n", 200).await;
        let address = http_lookup(&server).lookup(RecordKind::A).await.unwrap();
        assert_eq!(address, "203.0.113.5".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_http_lookup_ipv6() {
        let server = lookup_server("/v6", "2001:db8::5", 200).await;
        let address = http_lookup(&server).lookup(RecordKind::Aaaa).await.unwrap();
        assert_eq!(address, "2001:db8::5".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_http_lookup_rejects_wrong_family() {
        let server = lookup_server("/v6", "203.0.113.5", 200).await;
        let error = http_lookup(&server)
            .lookup(RecordKind::Aaaa)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Connectivity { .. }));
        assert!(error.to_string().contains("expected IPv6"));
    }

    #[tokio::test]
    async fn test_http_lookup_rejects_garbage() {
        let server = lookup_server("/v4", "<html>rate limited</html>", 200).await;
        let error = http_lookup(&server).lookup(RecordKind::A).await.unwrap_err();
        assert!(error.to_string().contains("not an IP address"));
    }

    #[tokio::test]
    async fn test_http_lookup_rejects_error_status() {
        let server = lookup_server("/v4", "203.0.113.5", 503).await;
        let error = http_lookup(&server).lookup(RecordKind::A).await.unwrap_err();
        assert!(error.is_transient());
    }

    #[tokio::test]
    async fn test_http_lookup_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("203.0.113.5")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let lookup = HttpAddressLookup::new(
            format!("{}/v4", server.uri()),
            format!("{}/v6", server.uri()),
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(lookup.lookup(RecordKind::A).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_single_family() {
        let detector = detector(Some("203.0.113.5"), Some("2001:db8::5"));
        let addresses = detector.resolve(RecordType::A).await.unwrap();
        assert_eq!(addresses, vec!["203.0.113.5".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_resolve_dual_orders_ipv4_first() {
        let detector = detector(Some("203.0.113.5"), Some("2001:db8::5"));
        let addresses = detector.resolve(RecordType::Dual).await.unwrap();
        assert_eq!(
            addresses,
            vec![
                "203.0.113.5".parse::<IpAddr>().unwrap(),
                "2001:db8::5".parse::<IpAddr>().unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_dual_tolerates_one_failed_leg() {
        let detector = detector(None, Some("2001:db8::5"));
        let addresses = detector.resolve(RecordType::Dual).await.unwrap();
        assert_eq!(addresses, vec!["2001:db8::5".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_resolve_fails_when_every_leg_fails() {
        let detector = detector(None, None);
        let error = detector.resolve(RecordType::Dual).await.unwrap_err();
        assert_eq!(
            error,
            Error::NoAddressDetected {
                record_type: "A/AAAA".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_single_family_failure() {
        let detector = detector(None, Some("2001:db8::5"));
        assert!(detector.resolve(RecordType::A).await.is_err());
    }
}
