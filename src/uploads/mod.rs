//! Upload safety subsystem.
//!
//! # Data Flow
//! ```text
//! Multipart file parts (RawUpload)
//!     → validator.rs (count, per-file and aggregate size)
//!     → filename.rs (sanitize declared name, check extension)
//!     → magic.rs (leading bytes must match the expected kind)
//!     → ValidatedUpload (only type a conversion backend accepts)
//! ```
//!
//! # Design Decisions
//! - All or nothing: one bad file rejects the whole batch
//! - Limits are enforced before any content is inspected
//! - Extensions narrow the accepted set; they never prove the content type

pub mod filename;
pub mod magic;
pub mod validator;

pub use filename::{content_disposition, output_filename, sanitize_filename};
pub use magic::{detect, ExpectedKind, FileKind};
pub use validator::{RawUpload, SecurityValidator, UploadError, ValidatedUpload};
