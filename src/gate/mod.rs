//! Admission gate subsystem.
//!
//! # Data Flow
//! ```text
//! (client key, presented credential)
//!     → admission.rs
//!         RateLimiter.allow      → RateLimited (retry after)
//!         LockoutTracker.locked  → Locked (no comparison performed)
//!         Authenticator.verify   → Unauthorized (failure recorded)
//!     → Admission
//!     → endpoint validators (uploads, pages)
//!     → ConversionBackend
//! ```
//!
//! # Design Decisions
//! - One rejection taxonomy (outcome.rs) shared by the gate and the handlers
//! - Rejections are terminal; the gate never retries on the caller's behalf

pub mod admission;
pub mod outcome;

pub use admission::{Admission, AdmissionGate};
pub use outcome::Rejection;
