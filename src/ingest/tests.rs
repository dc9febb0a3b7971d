//! Ingestor Module Tests
//!
//! ## Test Scopes
//! - **Protocol**: Decoding of valid, malformed, incomplete and unknown messages.
//! - **Datagram handling**: Address attribution from the envelope, event publication.
//! - **Receive loop**: Real loopback sockets, recovery after bad datagrams, shutdown.

#[cfg(test)]
mod tests {
    use crate::events::bus::EventBus;
    use crate::events::types::RegistryEvent;
    use crate::ingest::listener::{AnnouncementIngestor, RecvFailures};
    use crate::ingest::protocol::{
        Announcement, DecodeError, MAX_DATAGRAM_SIZE, decode, encode_heartbeat,
    };
    use crate::registry::store::MembershipStore;
    use crate::registry::types::{ServiceId, UpsertOutcome};
    use std::io;
    use std::net::{IpAddr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tokio_util::sync::CancellationToken;

    async fn ingestor() -> (Arc<AnnouncementIngestor>, Arc<MembershipStore>, EventBus) {
        let store = MembershipStore::new();
        let events = EventBus::new(64);
        let ingestor = AnnouncementIngestor::bind(
            "127.0.0.1:0".parse().unwrap(),
            store.clone(),
            events.clone(),
        )
        .await
        .expect("Failed to bind ingestor");

        (ingestor, store, events)
    }

    fn src(addr: &str) -> SocketAddr {
        addr.parse().unwrap()
    }

    /// A heartbeat for `service` padded with trailing whitespace to exactly `len` bytes.
    fn padded_heartbeat(service: &str, len: usize) -> Vec<u8> {
        let mut payload = encode_heartbeat(service, 8080).unwrap();
        assert!(payload.len() <= len);
        payload.resize(len, b' ');
        payload
    }

    // ============================================================
    // PROTOCOL TESTS
    // ============================================================

    #[test]
    fn test_decode_heartbeat() {
        let decoded = decode(br#"{"type":"HEARTBEAT","service":"svc-A","port":8080}"#).unwrap();

        assert_eq!(
            decoded,
            Announcement::Heartbeat {
                service: ServiceId::from("svc-A"),
                port: 8080,
            }
        );
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let decoded =
            decode(br#"{"type":"HEARTBEAT","service":"svc-A","port":1,"ip":"6.6.6.6"}"#).unwrap();

        assert!(matches!(decoded, Announcement::Heartbeat { port: 1, .. }));
    }

    #[test]
    fn test_decode_unknown_type() {
        let decoded = decode(br#"{"type":"PING"}"#).unwrap();
        assert_eq!(
            decoded,
            Announcement::Unknown {
                kind: "PING".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(matches!(
            decode(b"not json at all"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode(br#"["HEARTBEAT","svc-A",8080]"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_requires_string_type() {
        assert!(matches!(
            decode(br#"{"service":"svc-A","port":8080}"#),
            Err(DecodeError::MissingField("type"))
        ));
        assert!(matches!(
            decode(br#"{"type":7,"service":"svc-A","port":8080}"#),
            Err(DecodeError::InvalidField { field: "type", .. })
        ));
    }

    #[test]
    fn test_unknown_type_ignores_shape_of_other_fields() {
        assert_eq!(
            decode(br#"{"type":"LEAVE","service":"svc-A","port":"n/a"}"#).unwrap(),
            Announcement::Unknown {
                kind: "LEAVE".to_string()
            }
        );
        assert_eq!(
            decode(br#"{"type":"PING","service":42}"#).unwrap(),
            Announcement::Unknown {
                kind: "PING".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(matches!(
            decode(&[0xff, 0xfe, 0x00]),
            Err(DecodeError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert!(matches!(
            decode(br#"{"type":"HEARTBEAT","port":8080}"#),
            Err(DecodeError::MissingField("service"))
        ));
        assert!(matches!(
            decode(br#"{"type":"HEARTBEAT","service":"svc-A"}"#),
            Err(DecodeError::MissingField("port"))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_fields() {
        for payload in [
            r#"{"type":"HEARTBEAT","service":"","port":8080}"#,
            r#"{"type":"HEARTBEAT","service":"svc-A","port":0}"#,
            r#"{"type":"HEARTBEAT","service":"svc-A","port":65536}"#,
            r#"{"type":"HEARTBEAT","service":"svc-A","port":-1}"#,
            r#"{"type":"HEARTBEAT","service":"svc-A","port":"8080"}"#,
            r#"{"type":"HEARTBEAT","service":42,"port":8080}"#,
        ] {
            assert!(
                matches!(decode(payload.as_bytes()), Err(DecodeError::InvalidField { .. })),
                "expected invalid field for {}",
                payload
            );
        }
    }

    #[test]
    fn test_decode_rejects_oversized() {
        let payload = vec![b' '; MAX_DATAGRAM_SIZE + 1];
        assert!(matches!(
            decode(&payload),
            Err(DecodeError::Oversized { len, .. }) if len == MAX_DATAGRAM_SIZE + 1
        ));
    }

    #[test]
    fn test_encoded_heartbeat_decodes() {
        let encoded = encode_heartbeat("svc-A", 8080).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(json["type"], "HEARTBEAT");
        assert_eq!(json["service"], "svc-A");
        assert_eq!(json["port"], 8080);
    }

    // ============================================================
    // DATAGRAM HANDLING TESTS
    // ============================================================

    #[tokio::test]
    async fn test_malformed_datagram_does_not_block_next_heartbeat() {
        let (ingestor, store, _events) = ingestor().await;

        assert!(ingestor.handle_datagram(b"{garbage", src("10.0.0.5:40000")).is_err());

        let outcome = ingestor
            .handle_datagram(
                br#"{"type":"HEARTBEAT","service":"svc-A","port":8080}"#,
                src("10.0.0.5:40000"),
            )
            .unwrap();

        assert_eq!(outcome, Some(UpsertOutcome::Registered));
        assert_eq!(store.len(), 1);

        let record = store.get(&ServiceId::from("svc-A")).unwrap();
        assert_eq!(record.address, "10.0.0.5".parse::<IpAddr>().unwrap());
        assert_eq!(record.listen_port, 8080);
    }

    #[tokio::test]
    async fn test_last_source_address_wins() {
        let (ingestor, store, _events) = ingestor().await;
        let heartbeat = br#"{"type":"HEARTBEAT","service":"svc-A","port":8080}"#;

        ingestor.handle_datagram(heartbeat, src("10.0.0.5:40000")).unwrap();
        let outcome = ingestor.handle_datagram(heartbeat, src("10.0.0.6:40000")).unwrap();

        assert_eq!(outcome, Some(UpsertOutcome::Refreshed));
        let record = store.get(&ServiceId::from("svc-A")).unwrap();
        assert_eq!(record.address, "10.0.0.6".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_unknown_type_leaves_store_unchanged() {
        let (ingestor, store, _events) = ingestor().await;

        let outcome = ingestor
            .handle_datagram(
                br#"{"type":"PING","service":"svc-A","port":8080}"#,
                src("10.0.0.5:40000"),
            )
            .unwrap();

        assert_eq!(outcome, None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_ipv4_mapped_source_is_canonicalized() {
        let (ingestor, store, _events) = ingestor().await;

        ingestor
            .handle_datagram(
                br#"{"type":"HEARTBEAT","service":"svc-A","port":8080}"#,
                src("[::ffff:10.0.0.5]:40000"),
            )
            .unwrap();

        let record = store.get(&ServiceId::from("svc-A")).unwrap();
        assert_eq!(record.address, "10.0.0.5".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_registered_then_refreshed_events() {
        let (ingestor, _store, events) = ingestor().await;
        let mut rx = events.subscribe();
        let heartbeat = br#"{"type":"HEARTBEAT","service":"svc-A","port":8080}"#;

        ingestor.handle_datagram(heartbeat, src("10.0.0.5:40000")).unwrap();
        ingestor.handle_datagram(heartbeat, src("10.0.0.6:40000")).unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::Registered {
                identity: ServiceId::from("svc-A"),
                address: "10.0.0.5".parse().unwrap(),
                port: 8080,
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::Refreshed {
                identity: ServiceId::from("svc-A"),
                address: "10.0.0.6".parse().unwrap(),
                port: 8080,
            }
        );
    }

    // ============================================================
    // RECEIVE LOOP TESTS
    // ============================================================

    #[tokio::test]
    async fn test_receive_loop_over_loopback() {
        let (ingestor, store, events) = ingestor().await;
        let target = ingestor.local_addr().unwrap();
        let mut rx = events.subscribe();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(ingestor.clone().run(shutdown.clone()));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"\x00\x01 nonsense", target).await.unwrap();
        sender.send_to(&vec![b'x'; 4096], target).await.unwrap();
        sender
            .send_to(&encode_heartbeat("svc-A", 8080).unwrap(), target)
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event received")
            .unwrap();

        assert!(matches!(event, RegistryEvent::Registered { .. }));
        assert_eq!(store.len(), 1);

        let record = store.get(&ServiceId::from("svc-A")).unwrap();
        assert_eq!(record.address, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(record.listen_port, 8080);

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("receive loop did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_datagram_size_limit_over_loopback() {
        let (ingestor, store, events) = ingestor().await;
        let target = ingestor.local_addr().unwrap();
        let mut rx = events.subscribe();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(ingestor.clone().run(shutdown.clone()));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(&padded_heartbeat("svc-A", MAX_DATAGRAM_SIZE), target)
            .await
            .unwrap();
        sender
            .send_to(&padded_heartbeat("svc-B", MAX_DATAGRAM_SIZE + 1), target)
            .await
            .unwrap();
        sender
            .send_to(&encode_heartbeat("svc-C", 8080).unwrap(), target)
            .await
            .unwrap();

        // svc-C was sent last, so once it is registered the other two have been handled.
        let mut registered = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Ok(event) = rx.recv().await {
                if let RegistryEvent::Registered { identity, .. } = event {
                    let done = identity.as_str() == "svc-C";
                    registered.push(identity);
                    if done {
                        break;
                    }
                }
            }
        })
        .await
        .expect("marker heartbeat not received");

        assert_eq!(
            registered,
            vec![ServiceId::from("svc-A"), ServiceId::from("svc-C")]
        );
        assert!(store.get(&ServiceId::from("svc-A")).is_some());
        assert!(store.get(&ServiceId::from("svc-B")).is_none());
        assert_eq!(store.len(), 2);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn test_receive_errors_below_limit_are_transient() {
        let mut failures = RecvFailures::new(3);

        assert!(failures.record(io::Error::from(io::ErrorKind::Interrupted)).is_ok());
        assert!(failures.record(io::Error::from(io::ErrorKind::Interrupted)).is_ok());

        // A successful receive starts the count over
        failures.reset();
        assert!(failures.record(io::Error::from(io::ErrorKind::Interrupted)).is_ok());
        assert!(failures.record(io::Error::from(io::ErrorKind::Interrupted)).is_ok());
    }

    #[test]
    fn test_receive_errors_at_limit_are_fatal() {
        let mut failures = RecvFailures::new(3);

        for _ in 0..2 {
            failures
                .record(io::Error::from(io::ErrorKind::ConnectionReset))
                .unwrap();
        }

        let err = failures
            .record(io::Error::from(io::ErrorKind::ConnectionReset))
            .unwrap_err();
        assert!(err.to_string().contains("failed 3 times in a row"));
        assert_eq!(
            err.downcast_ref::<io::Error>().map(|e| e.kind()),
            Some(io::ErrorKind::ConnectionReset)
        );
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let (first, _store, _events) = ingestor().await;
        let taken = first.local_addr().unwrap();

        let result =
            AnnouncementIngestor::bind(taken, MembershipStore::new(), EventBus::new(8)).await;

        assert!(result.is_err());
    }
}
