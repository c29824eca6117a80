//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! add(method, path, target)
//!     → target.rs (parse host, port, base path)
//!     → table.rs (append under lock)
//!
//! Incoming request (method, path)
//!     → table.rs (exact lookup, first match wins)
//!     → path.rs (base path + request path for the upstream)
//! ```
//!
//! # Design Decisions
//! - Exact (method, path) matching only: no prefixes, wildcards or templates
//! - Routes can be added while traffic is flowing
//! - Matched routes are copied out of the table before forwarding

pub mod path;
pub mod table;
pub mod target;

pub use path::join_paths;
pub use table::{validate_method, Route, RouteSummary, RouteTable};
pub use target::TargetSpec;
