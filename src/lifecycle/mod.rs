//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → listener stops accepting, drains in-flight requests
//!               → maintenance task exits
//! ```
//!
//! # Design Decisions
//! - Startup is fail fast: invalid config never binds a socket
//! - Tracker state is in memory only; nothing to flush on exit

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{spawn_signal_listener, wait_for_signal};
