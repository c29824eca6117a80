//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Register routes → Start gateway listener → Start admin API
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Release ports → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown
//! ```
//!
//! # Design Decisions
//! - Shutdown is abrupt: in-flight requests are not drained

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{launch, Launched};
