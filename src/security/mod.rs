//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (client key + presented credential):
//!     → rate_limit.rs (fixed-window count per client)
//!     → lockout.rs (refuse clients with too many recent failures)
//!     → auth.rs (constant-time comparison against the API key)
//!     → Pass to upload validation
//! ```
//!
//! # Design Decisions
//! - Cheap checks first: limits and lockout bound what the comparison costs
//! - Fail closed: reject on any security check failure
//! - State is per process and in memory; replicas do not share budgets

pub mod auth;
pub mod lockout;
pub mod rate_limit;

pub use auth::TimingSafeAuthenticator;
pub use lockout::{LockoutState, LockoutTracker};
pub use rate_limit::{RateDecision, RateLimiter};
