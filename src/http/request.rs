//! Inbound request parsing.
//!
//! # Responsibilities
//! - Read the request head off the client socket with `httparse`
//! - Split the request target into path and query
//! - Extract the declared body length
//!
//! # Design Decisions
//! - Header names and values are kept in arrival order, untouched
//! - Bytes read past the head are handed back so they can lead the body stream
//! - The head size is capped; the body is never buffered here

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Maximum number of headers accepted in a request head.
pub const MAX_HEADERS: usize = 64;

const READ_CHUNK_SIZE: usize = 2048;

/// Error type for request head parsing.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request head: {0}")]
    Malformed(#[from] httparse::Error),

    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),

    #[error("invalid Content-Length `{0}`")]
    InvalidContentLength(String),

    #[error("connection closed mid-head")]
    Incomplete,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything before the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Method exactly as sent by the client.
    pub method: String,
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    /// Header values are raw bytes; obs-text is allowed and relayed untouched.
    pub headers: Vec<(String, Vec<u8>)>,
    /// Declared body length; 0 when no `Content-Length` was sent.
    pub content_length: u64,
}

impl RequestHead {
    /// First header value with the given name, compared case-insensitively.
    /// `None` as well when the value is not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| std::str::from_utf8(v).ok())
    }
}

/// A parsed request head plus a readable body stream.
#[derive(Debug)]
pub struct InboundRequest<B> {
    pub head: RequestHead,
    pub body: B,
}

impl<B> InboundRequest<B> {
    pub fn new(head: RequestHead, body: B) -> Self {
        Self { head, body }
    }
}

/// Read a request head from `reader`.
///
/// Returns `Ok(None)` if the peer closed before sending anything. On success
/// the second value holds any bytes read past the head.
pub async fn read_request_head<R>(
    reader: &mut R,
    max_head_bytes: usize,
) -> Result<Option<(RequestHead, Vec<u8>)>, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK_SIZE);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(RequestError::Incomplete)
            };
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some((head, consumed)) = parse_head(&buf)? {
            if consumed > max_head_bytes {
                return Err(RequestError::TooLarge(max_head_bytes));
            }
            let leftover = buf.split_off(consumed);
            return Ok(Some((head, leftover)));
        }

        if buf.len() > max_head_bytes {
            return Err(RequestError::TooLarge(max_head_bytes));
        }
    }
}

/// Parse a complete head from `buf`, returning it with the number of bytes consumed.
fn parse_head(buf: &[u8]) -> Result<Option<(RequestHead, usize)>, RequestError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    let consumed = match req.parse(buf)? {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Ok(None),
    };

    let method = req.method.unwrap_or_default().to_string();
    let (path, query) = split_target(req.path.unwrap_or("/"));
    let headers: Vec<(String, Vec<u8>)> = req
        .headers
        .iter()
        .map(|h| (h.name.to_string(), h.value.to_vec()))
        .collect();

    let mut head = RequestHead {
        method,
        path,
        query,
        headers,
        content_length: 0,
    };
    let declared = head
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| String::from_utf8_lossy(value));
    head.content_length = match declared {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| RequestError::InvalidContentLength(value.to_string()))?,
        None => 0,
    };

    Ok(Some((head, consumed)))
}

/// Split a request target into (path, query). Absolute-form targets are reduced to their path.
fn split_target(target: &str) -> (String, Option<String>) {
    let origin = if target.starts_with('/') {
        target
    } else {
        match target.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |slash| &rest[slash..]),
            None => target,
        }
    };

    match origin.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (origin.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read(raw: &[u8]) -> Result<Option<(RequestHead, Vec<u8>)>, RequestError> {
        let mut reader = raw;
        read_request_head(&mut reader, 1024).await
    }

    #[tokio::test]
    async fn parses_head_and_keeps_leftover_body() {
        let raw = b"POST /submit?a=1&b=2 HTTP/1.1\r\nHost: gw\r\nContent-Length: 5\r\nX-Trace: t1\r\n\r\nhello";
        let (head, leftover) = read(raw).await.unwrap().unwrap();

        assert_eq!(head.method, "POST");
        assert_eq!(head.path, "/submit");
        assert_eq!(head.query.as_deref(), Some("a=1&b=2"));
        assert_eq!(head.content_length, 5);
        assert_eq!(
            head.headers,
            vec![
                ("Host".to_string(), b"gw".to_vec()),
                ("Content-Length".to_string(), b"5".to_vec()),
                ("X-Trace".to_string(), b"t1".to_vec()),
            ]
        );
        assert_eq!(head.header("x-trace"), Some("t1"));
        assert_eq!(leftover, b"hello");
    }

    #[tokio::test]
    async fn non_utf8_header_value_is_kept_as_sent() {
        let (head, _) = read(b"GET / HTTP/1.1\r\nX-Name: caf\xe9\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(head.headers, vec![("X-Name".to_string(), b"caf\xe9".to_vec())]);
        assert_eq!(head.header("x-name"), None);
    }

    #[tokio::test]
    async fn missing_content_length_means_zero() {
        let (head, leftover) = read(b"GET / HTTP/1.1\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(head.content_length, 0);
        assert_eq!(head.query, None);
        assert!(leftover.is_empty());
    }

    #[tokio::test]
    async fn absolute_form_target_is_reduced_to_path() {
        let (head, _) = read(b"GET http://example.com/a/b?q HTTP/1.1\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(head.path, "/a/b");
        assert_eq!(head.query.as_deref(), Some("q"));

        let (head, _) = read(b"GET http://example.com HTTP/1.1\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(head.path, "/");
    }

    #[tokio::test]
    async fn empty_query_is_kept_as_empty() {
        let (head, _) = read(b"GET /x? HTTP/1.1\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(head.path, "/x");
        assert_eq!(head.query.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn closed_before_any_byte_is_none() {
        assert!(read(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_bad_heads() {
        assert!(matches!(read(b"GET / HTTP/1.1\r\nHost").await, Err(RequestError::Incomplete)));
        assert!(matches!(read(b"\x01\x02 nonsense\r\n\r\n").await, Err(RequestError::Malformed(_))));
        assert!(matches!(
            read(b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n").await,
            Err(RequestError::InvalidContentLength(_))
        ));

        let oversized = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(2000));
        assert!(matches!(read(oversized.as_bytes()).await, Err(RequestError::TooLarge(1024))));
    }
}
