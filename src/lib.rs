//! Exact-match reverse-proxy gateway.
//!
//! Requests are matched on (method, path) against a mutable route table and
//! forwarded to an upstream `host:port` plus base path. The upstream response
//! is relayed to the client unmodified.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use http::{Gateway, GatewayState};
pub use lifecycle::Shutdown;
pub use routing::{Route, RouteTable};
