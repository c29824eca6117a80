//! Request forwarding to upstream servers.
//!
//! # Responsibilities
//! - Open a fresh upstream connection per request
//! - Rewrite the request head for the upstream (HTTP/1.0, Host, path)
//! - Relay the declared request body
//! - Copy the upstream response to the client byte for byte
//!
//! # Design Decisions
//! - No pooling: every request connects, and the socket is dropped on every exit path
//! - The full request is written before any response byte is read; if the
//!   upstream stops reading early, whatever it answered is still relayed
//! - HTTP/1.0 upstream requests mean the response ends at EOF, so no
//!   response framing has to be understood
//! - Connect failures are never retried

use axum::http::StatusCode;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{GatewayError, Result};
use crate::http::request::{InboundRequest, RequestHead};
use crate::http::response::write_error;
use crate::routing::{join_paths, Route};

/// Chunk size for body and response relay.
pub const RELAY_CHUNK_SIZE: usize = 4096;

/// Forwards matched requests to their upstream.
#[derive(Debug, Clone, Default)]
pub struct Forwarder {
    connect_timeout: Option<Duration>,
}

impl Forwarder {
    /// `connect_timeout` of `None` waits as long as the OS does.
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    /// Forward `request` to `route`'s upstream and relay the response into `sink`.
    ///
    /// Returns the number of response bytes relayed. When the failure happens
    /// before any response byte was relayed, a `502` has already been written
    /// to `sink` by the time the error is returned.
    pub async fn forward<B, W>(&self, route: &Route, request: InboundRequest<B>, sink: &mut W) -> Result<u64>
    where
        B: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut upstream = match self.connect(route).await {
            Ok(stream) => stream,
            Err(source) => {
                reply_bad_gateway(sink, "Upstream connect failed").await;
                return Err(GatewayError::UpstreamConnectFailed {
                    upstream: route.upstream_authority(),
                    source,
                });
            }
        };

        let InboundRequest { head, mut body } = request;
        let sent = send_request(&mut upstream, route, &head, &mut body).await;
        if let Err(e) = &sent {
            // An upstream may answer early (e.g. 413) and close; its response still goes back.
            tracing::debug!(upstream = %route.upstream_authority(), error = %e, "Upstream stopped reading the request");
        }

        let mut relayed = 0;
        let received = relay_response(&mut upstream, sink, &mut relayed).await;
        match (sent, received) {
            (_, Ok(())) if relayed > 0 => Ok(relayed),
            (Ok(()), Ok(())) => Ok(relayed),
            (Err(e), _) | (_, Err(e)) => {
                if relayed == 0 {
                    reply_bad_gateway(sink, "Upstream request failed").await;
                }
                Err(e.into())
            }
        }
    }

    async fn connect(&self, route: &Route) -> std::io::Result<TcpStream> {
        let connect = TcpStream::connect((route.host(), route.port()));
        match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::TimedOut, format!("connect timed out after {limit:?}"))
            })?,
            None => connect.await,
        }
    }
}

async fn reply_bad_gateway<W>(sink: &mut W, message: &str)
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = write_error(sink, StatusCode::BAD_GATEWAY, message).await {
        tracing::debug!(error = %e, "Failed to write 502 to client");
    }
}

/// Upstream request head: request line, upstream `Host`, `Connection: close`,
/// then the client's headers minus `Host` and `Connection`.
///
/// Header values are copied as raw bytes.
pub fn build_request_head(route: &Route, head: &RequestHead) -> Vec<u8> {
    let mut target_path = join_paths(route.base_path(), &head.path);
    if let Some(query) = head.query.as_deref().filter(|q| !q.is_empty()) {
        target_path.push('?');
        target_path.push_str(query);
    }

    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(format!("{} {} HTTP/1.0\r\n", head.method, target_path).as_bytes());
    out.extend_from_slice(format!("Host: {}\r\n", route.upstream_authority()).as_bytes());
    out.extend_from_slice(b"Connection: close\r\n");

    let mut has_content_length = false;
    for (name, value) in &head.headers {
        if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("connection") {
            continue;
        }
        if name.eq_ignore_ascii_case("content-length") {
            has_content_length = true;
        }
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value);
        out.extend_from_slice(b"\r\n");
    }
    if !has_content_length {
        out.extend_from_slice(format!("Content-Length: {}\r\n", head.content_length).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out
}

async fn send_request<U, B>(upstream: &mut U, route: &Route, head: &RequestHead, body: &mut B) -> std::io::Result<()>
where
    U: AsyncWrite + Unpin,
    B: AsyncRead + Unpin,
{
    upstream.write_all(&build_request_head(route, head)).await?;

    if head.content_length > 0 {
        let sent = relay_body(body, upstream, head.content_length).await?;
        if sent < head.content_length {
            tracing::debug!(declared = head.content_length, sent, "Client body ended early");
        }
    }

    upstream.flush().await
}

/// Copy up to `declared` bytes of request body. A client that stops early
/// (EOF or read error) ends the copy; what was read is still sent.
async fn relay_body<B, U>(body: &mut B, upstream: &mut U, declared: u64) -> std::io::Result<u64>
where
    B: AsyncRead + Unpin,
    U: AsyncWrite + Unpin,
{
    let mut buf = [0u8; RELAY_CHUNK_SIZE];
    let mut remaining = declared;

    while remaining > 0 {
        let want = remaining.min(RELAY_CHUNK_SIZE as u64) as usize;
        let n = match body.read(&mut buf[..want]).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "Client body read failed");
                break;
            }
        };
        upstream.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }

    Ok(declared - remaining)
}

async fn relay_response<U, W>(upstream: &mut U, sink: &mut W, relayed: &mut u64) -> std::io::Result<()>
where
    U: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; RELAY_CHUNK_SIZE];
    loop {
        let n = upstream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        *relayed += n as u64;
    }
    sink.flush().await
}
