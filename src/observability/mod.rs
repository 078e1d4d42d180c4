//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, audit trail of rejections)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Audit logs carry client key and outcome kind, never credentials
//! - Request ID flows through the trace span of every request
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
