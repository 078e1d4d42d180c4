//! Upload admission: count, size, filename and signature checks.

use axum::body::Bytes;

use crate::config::UploadConfig;
use crate::uploads::filename::{sanitize_filename, split_extension};
use crate::uploads::magic::{detect, ExpectedKind, FileKind};

/// Reasons an upload is refused. None of them are retryable without new input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("file content does not match an accepted type")]
    BadSignature,
    #[error("upload exceeds the {limit}-byte limit")]
    TooLarge { limit: usize },
    #[error("at most {max} files may be submitted, got {got}")]
    TooManyFiles { max: usize, got: usize },
    #[error("at least {min} files are required, got {got}")]
    TooFewFiles { min: usize, got: usize },
    #[error("filename missing or extension not accepted")]
    BadFilename,
}

/// A file part as received, before any checks.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub filename: Option<String>,
    pub content: Bytes,
}

impl RawUpload {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: Some(filename.into()),
            content: content.into(),
        }
    }
}

/// An upload that passed every check. Only these reach a conversion backend.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    content: Bytes,
    declared_filename: String,
    sanitized_filename: String,
    detected_kind: FileKind,
}

impl ValidatedUpload {
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn declared_filename(&self) -> &str {
        &self.declared_filename
    }

    pub fn sanitized_filename(&self) -> &str {
        &self.sanitized_filename
    }

    pub fn detected_kind(&self) -> FileKind {
        self.detected_kind
    }

    /// Short BLAKE3 fingerprint of the content for audit logs.
    pub fn fingerprint(&self) -> String {
        let hex = blake3::hash(&self.content).to_hex();
        hex.as_str()[..16].to_string()
    }
}

/// Checks uploads against the configured limits and the expected content kind.
#[derive(Debug, Clone)]
pub struct SecurityValidator {
    limits: UploadConfig,
}

impl SecurityValidator {
    pub fn new(limits: UploadConfig) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &UploadConfig {
        &self.limits
    }

    /// Validate a single-file submission.
    pub fn validate(
        &self,
        upload: RawUpload,
        expected: ExpectedKind,
    ) -> Result<ValidatedUpload, UploadError> {
        let mut batch = self.validate_batch(vec![upload], expected, 1)?;
        batch.pop().ok_or(UploadError::TooFewFiles { min: 1, got: 0 })
    }

    /// Validate a batch, all or nothing.
    ///
    /// Count and size limits are checked over the whole submission before any
    /// file is inspected, so an oversized or overlong batch is refused outright
    /// rather than truncated.
    pub fn validate_batch(
        &self,
        uploads: Vec<RawUpload>,
        expected: ExpectedKind,
        min_files: usize,
    ) -> Result<Vec<ValidatedUpload>, UploadError> {
        let got = uploads.len();
        if got > self.limits.max_files {
            return Err(UploadError::TooManyFiles {
                max: self.limits.max_files,
                got,
            });
        }
        if got < min_files.max(1) {
            return Err(UploadError::TooFewFiles {
                min: min_files.max(1),
                got,
            });
        }

        let mut total = 0usize;
        for upload in &uploads {
            if upload.content.len() > self.limits.max_file_bytes {
                return Err(UploadError::TooLarge {
                    limit: self.limits.max_file_bytes,
                });
            }
            total = total.saturating_add(upload.content.len());
        }
        self.check_aggregate(total)?;

        uploads
            .into_iter()
            .map(|upload| self.inspect(upload, expected))
            .collect()
    }

    /// Refuse a generated payload (e.g. an archive of extracted pages) over the aggregate cap.
    pub fn check_output_size(&self, len: usize) -> Result<(), UploadError> {
        self.check_aggregate(len)
    }

    fn check_aggregate(&self, len: usize) -> Result<(), UploadError> {
        if len > self.limits.max_aggregate_bytes {
            return Err(UploadError::TooLarge {
                limit: self.limits.max_aggregate_bytes,
            });
        }
        Ok(())
    }

    fn inspect(&self, upload: RawUpload, expected: ExpectedKind) -> Result<ValidatedUpload, UploadError> {
        let declared = upload
            .filename
            .filter(|name| !name.trim().is_empty())
            .ok_or(UploadError::BadFilename)?;

        let sanitized = sanitize_filename(&declared, self.limits.max_filename_len);
        match split_extension(&sanitized) {
            (_, Some(ext)) if expected.accepts_extension(&ext) => {}
            _ => return Err(UploadError::BadFilename),
        }

        let kind = detect(&upload.content)
            .filter(|kind| expected.accepts(*kind))
            .ok_or(UploadError::BadSignature)?;

        Ok(ValidatedUpload {
            content: upload.content,
            declared_filename: declared,
            sanitized_filename: sanitized,
            detected_kind: kind,
        })
    }
}
