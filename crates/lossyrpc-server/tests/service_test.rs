// Integration tests for lossyrpc-server
//
// These tests start a real service on an ephemeral loopback port and talk to
// it with the raw transport, so malformed and unexpected traffic can be sent.

use lossyrpc_common::transport::{FaultConfig, JsonCodec, Received, UnreliableTransport};
use lossyrpc_common::{FailureKind, Request};
use lossyrpc_server::{coordination_interface, CoordinationObject, Service};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

// ============================================================================
// Test Helpers
// ============================================================================

async fn start_service() -> (Service, String) {
    let service = Service::builder()
        .interface(coordination_interface())
        .object(Arc::new(CoordinationObject::new()).into_service_object())
        .host("127.0.0.1")
        .port(0)
        .faults(FaultConfig::reliable().with_timeout(200, 0))
        .build()
        .expect("valid registration");
    let addr = service.start().await.expect("service starts");
    (service, addr.to_string())
}

async fn exchange(addr: &str, payload: &[u8]) -> Received {
    let mut transport = UnreliableTransport::connect(addr, FaultConfig::reliable())
        .await
        .expect("connects");
    transport.send(payload).await.expect("sends");
    let received = transport.receive().await.expect("receives");
    transport.close().await;
    received
}

async fn call(addr: &str, request: &Request) -> lossyrpc_common::Reply {
    let payload = JsonCodec::encode_request(request).unwrap();
    match exchange(addr, &payload).await {
        Received::Frame(bytes) => JsonCodec::decode_reply(&bytes).unwrap(),
        other => panic!("expected a reply, got {:?}", other),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_raw_request_gets_reply() {
    let (service, addr) = start_service().await;

    let reply = call(&addr, &Request::new("method", vec![json!(3), json!(false)])).await;
    assert!(reply.success);
    assert_eq!(reply.result, Some(vec![json!(3), json!("")]));
    assert_eq!(service.call_count(), 1);

    service.stop().await;
}

#[tokio::test]
async fn test_malformed_payload_is_dropped_and_service_survives() {
    let (service, addr) = start_service().await;

    assert_eq!(exchange(&addr, b"{not json").await, Received::Closed);
    assert_eq!(exchange(&addr, b"[1, 2, 3]").await, Received::Closed);

    let reply = call(&addr, &Request::new("method", vec![json!(1), json!(false)])).await;
    assert!(reply.success);
    assert_eq!(service.call_count(), 1);

    service.stop().await;
}

#[tokio::test]
async fn test_empty_frame_is_dropped() {
    let (service, addr) = start_service().await;

    // An explicit zero-length frame, written by hand.
    let mut raw = TcpStream::connect(&addr).await.unwrap();
    raw.write_all(&0u32.to_be_bytes()).await.unwrap();
    let mut transport = UnreliableTransport::new(raw, FaultConfig::reliable());
    assert_eq!(transport.receive().await.unwrap(), Received::Closed);

    assert_eq!(service.call_count(), 0);
    service.stop().await;
}

#[tokio::test]
async fn test_silent_client_is_timed_out() {
    let (service, addr) = start_service().await;

    let raw = TcpStream::connect(&addr).await.unwrap();
    let mut transport =
        UnreliableTransport::new(raw, FaultConfig::reliable().with_timeout(1_000, 0));
    // The service gives up after its own 200ms timeout and closes.
    assert_eq!(transport.receive().await.unwrap(), Received::Closed);

    service.stop().await;
}

#[tokio::test]
async fn test_dispatch_miss_gets_structured_reply() {
    let (service, addr) = start_service().await;

    let reply = call(&addr, &Request::new("missing", vec![])).await;
    assert!(!reply.success);
    assert_eq!(reply.kind, Some(FailureKind::Dispatch));
    assert!(reply.error.unwrap().contains("missing"));

    let reply = call(&addr, &Request::new("method", vec![json!("x"), json!(true)])).await;
    assert_eq!(reply.kind, Some(FailureKind::Dispatch));

    assert_eq!(service.call_count(), 0);
    service.stop().await;
}

#[tokio::test]
async fn test_in_flight_handler_finishes_after_stop() {
    let (service, addr) = start_service().await;

    let mut transport = UnreliableTransport::connect(&addr, FaultConfig::reliable())
        .await
        .unwrap();
    // Give the acceptor time to hand the connection to a handler.
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.stop().await;

    let payload = JsonCodec::encode_request(&Request::new("method", vec![json!(9), json!(true)])).unwrap();
    transport.send(&payload).await.unwrap();
    match transport.receive().await.unwrap() {
        Received::Frame(bytes) => {
            let reply = JsonCodec::decode_reply(&bytes).unwrap();
            assert_eq!(reply.result, Some(vec![json!(-9), json!("Error for value 9")]));
        }
        other => panic!("expected a reply, got {:?}", other),
    }
    assert_eq!(service.call_count(), 1);
}

#[tokio::test]
async fn test_dropping_a_running_service_releases_the_port() {
    let (service, addr) = start_service().await;
    drop(service);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = UnreliableTransport::connect(&addr, FaultConfig::reliable()).await;
    assert!(result.is_err());
}
