//! Structured rejection outcomes.

use std::time::Duration;

use crate::backend::BackendError;
use crate::pages::PageRangeError;
use crate::uploads::UploadError;

/// Every way a request can be turned away. All are terminal for the request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("too many requests")]
    RateLimited { retry_after: Duration },
    #[error("client temporarily locked after repeated authentication failures")]
    Locked { retry_after: Duration },
    #[error("missing or invalid API key")]
    Unauthorized,
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    PageRange(#[from] PageRangeError),
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Rejection {
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Rejection::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::RateLimited { .. } => "rate_limited",
            Rejection::Locked { .. } => "locked",
            Rejection::Unauthorized => "unauthorized",
            Rejection::Upload(e) => match e {
                UploadError::BadSignature => "bad_signature",
                UploadError::TooLarge { .. } => "too_large",
                UploadError::TooManyFiles { .. } => "too_many_files",
                UploadError::TooFewFiles { .. } => "too_few_files",
                UploadError::BadFilename => "bad_filename",
            },
            Rejection::PageRange(e) => match e {
                PageRangeError::MalformedRange { .. } => "malformed_range",
                PageRangeError::OutOfBounds { .. } => "out_of_bounds",
            },
            Rejection::InvalidField { .. } => "invalid_field",
            Rejection::Backend(e) => match e {
                BackendError::InvalidInput(_) => "unprocessable_input",
                BackendError::Failed(_) => "conversion_failed",
                BackendError::Unavailable => "backend_unavailable",
            },
        }
    }

    /// Seconds the caller should wait, for rejections that lift with time.
    /// Rounded up so a client never retries early.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Rejection::RateLimited { retry_after } | Rejection::Locked { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
            _ => None,
        }
    }

    /// Message safe to show the caller: never backend detail, paths, or credentials.
    pub fn public_message(&self) -> String {
        match self {
            Rejection::Backend(BackendError::InvalidInput(_)) => {
                "the file could not be processed".to_string()
            }
            Rejection::Backend(BackendError::Failed(_)) => "conversion failed".to_string(),
            other => other.to_string(),
        }
    }
}
