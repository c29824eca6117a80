//! Error responses generated by the gateway itself.
//!
//! Relayed upstream responses never pass through here; they are copied byte
//! for byte by the forwarder.

use axum::http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Wire form of a plain-text error response. Always closes the connection.
pub fn error_response(status: StatusCode, message: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n\
         {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error"),
        message.len(),
        message
    )
}

pub async fn write_error<W>(sink: &mut W, status: StatusCode, message: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(error_response(status, message).as_bytes()).await?;
    sink.flush().await
}
