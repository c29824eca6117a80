//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (read head with httparse, chain buffered body bytes)
//!     → server.rs (route lookup, 404 on miss)
//!     → forward.rs (upstream connect, request rewrite, byte relay)
//!     → response.rs (gateway-generated 400/404/502)
//!     → connection closed
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::Forwarder;
pub use request::{InboundRequest, RequestHead};
pub use server::{DispatchOutcome, Gateway, GatewayState, ServerSettings};
