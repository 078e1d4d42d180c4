//! Request admission gate for a file-conversion service.
//!
//! Every conversion request passes rate limiting, lockout, constant-time API
//! key comparison, and upload safety checks before a `ConversionBackend` ever
//! sees it.

pub mod backend;
pub mod clock;
pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pages;
pub mod security;
pub mod uploads;

pub use backend::{ConversionBackend, UnconfiguredBackend};
pub use config::GateConfig;
pub use gate::{Admission, AdmissionGate, Rejection};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
