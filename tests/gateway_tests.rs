//! End-to-end tests: real sockets between client, gateway and upstream.

mod common;

use std::time::Duration;

use common::{free_port, send_raw, start_recording_backend, UPSTREAM_RESPONSE};
use route_gateway::{Gateway, GatewayError, GatewayState};

const NOT_FOUND: &[u8] =
    b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 9\r\nConnection: close\r\n\r\nNot Found";

async fn listening_gateway() -> (Gateway, std::net::SocketAddr) {
    let gateway = Gateway::default();
    let addr = gateway.listen("127.0.0.1", free_port() as i64).await.unwrap();
    (gateway, addr)
}

#[tokio::test]
async fn forwards_request_and_relays_response_verbatim() {
    let (upstream, mut received) = start_recording_backend(UPSTREAM_RESPONSE).await;
    let (gateway, addr) = listening_gateway().await;
    gateway
        .add_route("GET", "/api/hello", &format!("http://127.0.0.1:{}", upstream.port()))
        .unwrap();

    let response = send_raw(
        addr,
        b"GET /api/hello?x=1 HTTP/1.1\r\nHost: gateway.local\r\nConnection: keep-alive\r\nX-Custom: a\r\n\r\n",
    )
    .await;

    assert_eq!(response, UPSTREAM_RESPONSE.as_bytes());
    let upstream_request = received.recv().await.unwrap();
    assert_eq!(
        String::from_utf8(upstream_request).unwrap(),
        format!(
            "GET /api/hello?x=1 HTTP/1.0\r\nHost: 127.0.0.1:{}\r\nConnection: close\r\nX-Custom: a\r\nContent-Length: 0\r\n\r\n",
            upstream.port()
        )
    );

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn non_utf8_header_bytes_reach_the_upstream_unchanged() {
    let (upstream, mut received) = start_recording_backend(UPSTREAM_RESPONSE).await;
    let (gateway, addr) = listening_gateway().await;
    gateway
        .add_route("GET", "/name", &format!("127.0.0.1:{}", upstream.port()))
        .unwrap();

    let response = send_raw(addr, b"GET /name HTTP/1.1\r\nHost: x\r\nX-Name: caf\xe9\r\n\r\n").await;
    assert_eq!(response, UPSTREAM_RESPONSE.as_bytes());

    let upstream_request = received.recv().await.unwrap();
    assert!(upstream_request
        .windows(14)
        .any(|line| line == b"X-Name: caf\xe9\r\n"));
}

#[tokio::test]
async fn base_path_is_prefixed() {
    let (upstream, mut received) = start_recording_backend(UPSTREAM_RESPONSE).await;
    let (gateway, addr) = listening_gateway().await;
    gateway
        .add_route("GET", "/users", &format!("127.0.0.1:{}/v2/", upstream.port()))
        .unwrap();

    send_raw(addr, b"GET /users HTTP/1.1\r\nHost: x\r\n\r\n").await;

    let upstream_request = received.recv().await.unwrap();
    assert!(upstream_request.starts_with(b"GET /v2/users HTTP/1.0\r\n"));
}

#[tokio::test]
async fn unknown_route_gets_exact_404() {
    let (gateway, addr) = listening_gateway().await;
    gateway.add_route("GET", "/known", "127.0.0.1:1").unwrap();

    let response = send_raw(addr, b"GET /unknown HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(response, NOT_FOUND);

    let response = send_raw(addr, b"POST /known HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n").await;
    assert_eq!(response, NOT_FOUND);
}

#[tokio::test]
async fn unreachable_upstream_gets_502() {
    let (gateway, addr) = listening_gateway().await;
    gateway
        .add_route("GET", "/down", &format!("127.0.0.1:{}", free_port()))
        .unwrap();

    let response = send_raw(addr, b"GET /down HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(
        response,
        b"HTTP/1.1 502 Bad Gateway\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 23\r\nConnection: close\r\n\r\nUpstream connect failed"
    );
}

#[tokio::test]
async fn request_body_is_relayed() {
    let (upstream, mut received) = start_recording_backend(UPSTREAM_RESPONSE).await;
    let (gateway, addr) = listening_gateway().await;
    gateway
        .add_route("post", "/submit", &format!("127.0.0.1:{}", upstream.port()))
        .unwrap();

    let response = send_raw(
        addr,
        b"POST /submit HTTP/1.1\r\nHost: x\r\nContent-Length: 11\r\n\r\nhello world",
    )
    .await;
    assert_eq!(response, UPSTREAM_RESPONSE.as_bytes());

    let upstream_request = String::from_utf8(received.recv().await.unwrap()).unwrap();
    assert!(upstream_request.starts_with("POST /submit HTTP/1.0\r\n"));
    assert!(upstream_request.contains("Content-Length: 11\r\n"));
    assert!(upstream_request.ends_with("\r\n\r\nhello world"));
}

#[tokio::test]
async fn routes_added_while_listening_take_effect() {
    let (upstream, _received) = start_recording_backend(UPSTREAM_RESPONSE).await;
    let (gateway, addr) = listening_gateway().await;

    let before = send_raw(addr, b"GET /late HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(before, NOT_FOUND);

    gateway
        .add_route("GET", "/late", &format!("127.0.0.1:{}", upstream.port()))
        .unwrap();
    let after = send_raw(addr, b"GET /late HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(after, UPSTREAM_RESPONSE.as_bytes());
}

#[tokio::test]
async fn first_registered_route_wins() {
    let (first, mut first_received) = start_recording_backend(UPSTREAM_RESPONSE).await;
    let (second, _second_received) =
        start_recording_backend("HTTP/1.0 200 OK\r\nContent-Length: 6\r\n\r\nsecond").await;
    let (gateway, addr) = listening_gateway().await;
    gateway.add_route("GET", "/dup", &format!("127.0.0.1:{}", first.port())).unwrap();
    gateway.add_route("GET", "/dup", &format!("127.0.0.1:{}", second.port())).unwrap();

    let response = send_raw(addr, b"GET /dup HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(response, UPSTREAM_RESPONSE.as_bytes());
    assert!(first_received.recv().await.is_some());
}

#[tokio::test]
async fn malformed_request_gets_400() {
    let (gateway, addr) = listening_gateway().await;

    let response = send_raw(addr, b"NOT A REQUEST\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.ends_with(b"Bad Request"));

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn invalid_ports_are_rejected() {
    let gateway = Gateway::default();
    for port in [0, -1, 65536, 70000] {
        match gateway.listen("127.0.0.1", port).await {
            Err(GatewayError::InvalidPort(p)) => assert_eq!(p, port),
            other => panic!("expected InvalidPort for {port}, got {other:?}"),
        }
    }
    assert_eq!(gateway.state().await, GatewayState::Stopped);
}

#[tokio::test]
async fn second_listen_fails_and_first_keeps_serving() {
    let (gateway, addr) = listening_gateway().await;

    match gateway.listen("127.0.0.1", free_port() as i64).await {
        Err(GatewayError::AlreadyRunning(active)) => assert_eq!(active, addr),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    let response = send_raw(addr, b"GET /nothing HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(response, NOT_FOUND);
}

#[tokio::test]
async fn port_in_use_is_listen_failed() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let gateway = Gateway::default();
    let result = gateway.listen("127.0.0.1", port as i64).await;
    assert!(matches!(result, Err(GatewayError::ListenFailed { .. })));
    assert_eq!(gateway.state().await, GatewayState::Stopped);
}

#[tokio::test]
async fn stop_is_idempotent_and_port_can_be_reused() {
    let (gateway, addr) = listening_gateway().await;
    assert_eq!(gateway.state().await, GatewayState::Listening);

    gateway.stop().await.unwrap();
    gateway.stop().await.unwrap();
    assert_eq!(gateway.state().await, GatewayState::Stopped);
    assert_eq!(gateway.local_addr().await, None);
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());

    let again = gateway.listen("127.0.0.1", addr.port() as i64).await.unwrap();
    assert_eq!(again, addr);
    let response = send_raw(again, b"GET /x HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(response, NOT_FOUND);
}

#[tokio::test]
async fn dropping_a_listening_gateway_releases_the_port() {
    let (gateway, addr) = listening_gateway().await;
    drop(gateway);

    let mut rebound = None;
    for _ in 0..50 {
        if let Ok(listener) = std::net::TcpListener::bind(addr) {
            rebound = Some(listener);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(rebound.is_some(), "port {} was not released", addr.port());
}
