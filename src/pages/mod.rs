//! Page-range expressions.
//!
//! # Data Flow
//! ```text
//! "1-3,5,7-10" + total pages of the uploaded document
//!     → range.rs (tokenize, bound-check, expand, de-duplicate)
//!     → PageSelection (ordered, duplicate-free, 1-based)
//! ```
//!
//! # Design Decisions
//! - Caller order is preserved; overlapping ranges keep the first occurrence
//! - Any bad token rejects the whole expression; nothing is clamped

pub mod range;

pub use range::{parse, PageRangeError, PageSelection};
