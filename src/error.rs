//! Error types shared across the gateway.
//!
//! Route registration and lifecycle failures are reported to the caller.
//! Per-request failures (`NoRouteMatch`, `UpstreamConnectFailed`, `UpstreamIo`)
//! never escape dispatch; they are converted into an HTTP error response.

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Gateway error types.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream target string could not be parsed.
    #[error("invalid target `{target}` (expected http://host[:port][/path]): {reason}")]
    InvalidTarget { target: String, reason: &'static str },

    /// Route method is empty or not an HTTP token.
    #[error("invalid method `{0}` (expected an HTTP token such as GET)")]
    InvalidMethod(String),

    /// Listen port outside (0, 65535].
    #[error("invalid port {0}")]
    InvalidPort(i64),

    /// `listen` called while a listener is already active.
    #[error("gateway already running on {0}")]
    AlreadyRunning(std::net::SocketAddr),

    /// Binding the listening socket failed.
    #[error("failed to listen on {address}: {source}")]
    ListenFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Opening the upstream connection failed.
    #[error("upstream connect to {upstream} failed: {source}")]
    UpstreamConnectFailed {
        upstream: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while talking to a connected upstream or relaying to the client.
    #[error("upstream I/O error: {0}")]
    UpstreamIo(#[from] std::io::Error),

    /// No registered route for the request.
    #[error("no route for {method} {path}")]
    NoRouteMatch { method: String, path: String },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;
