//! Conversion backend seam.
//!
//! # Data Flow
//! ```text
//! Admitted request
//!     → handler builds a ConversionJob (validated uploads + parsed fields only)
//!     → ConversionBackend::convert on the blocking pool
//!     → ConversionOutput (payload + content type) or BackendError
//! ```
//!
//! # Design Decisions
//! - The trait is synchronous: converters are CPU-bound library calls
//! - Jobs cannot be built from raw bytes or unparsed range strings
//! - Backend error detail is logged, never returned to the caller

use axum::body::Bytes;
use serde::Serialize;

use crate::pages::PageSelection;
use crate::uploads::ValidatedUpload;

/// Failure reported by a conversion backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The input passed the gate but the converter could not use it.
    #[error("converter rejected input: {0}")]
    InvalidInput(String),
    #[error("conversion failed: {0}")]
    Failed(String),
    #[error("conversion backend unavailable")]
    Unavailable,
}

/// Raster formats for PDF page rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Png,
    Jpeg,
    Tiff,
}

/// Output formats for image re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
    Tiff,
}

/// How images are arranged when combined into a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "layout")]
pub enum PageLayout {
    /// One image per page.
    Single,
    /// A grid of up to `per_page` images per page.
    Grouped { per_page: u8 },
}

/// Account type written into an OFX statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OfxAccountType {
    Checking,
    Savings,
    CreditCard,
}

impl OfxAccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfxAccountType::Checking => "CHECKING",
            OfxAccountType::Savings => "SAVINGS",
            OfxAccountType::CreditCard => "CREDITCARD",
        }
    }
}

/// What an image compression hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionOutput {
    /// The compressed image as a download.
    File,
    /// Size and dimension metrics as JSON, optionally with the image base64-encoded.
    Metrics { include_file: bool },
}

/// A document password. Never shown in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// A unit of conversion work. Every variant carries only validated input.
#[derive(Debug, Clone)]
pub enum ConversionJob {
    SplitPdf {
        document: ValidatedUpload,
        pages: PageSelection,
    },
    MergePdfs {
        documents: Vec<ValidatedUpload>,
    },
    ExtractPages {
        document: ValidatedUpload,
    },
    PdfInfo {
        document: ValidatedUpload,
    },
    PdfToImages {
        document: ValidatedUpload,
        format: RasterFormat,
        dpi: u16,
        pages: Option<PageSelection>,
    },
    ImagesToPdf {
        images: Vec<ValidatedUpload>,
        layout: PageLayout,
    },
    ConvertImage {
        image: ValidatedUpload,
        format: ImageFormat,
        quality: u8,
    },
    Transcribe {
        media: ValidatedUpload,
        language: Option<String>,
    },
    CutVideo {
        video: ValidatedUpload,
        start_secs: f64,
        end_secs: f64,
    },
    ProtectPdf {
        document: ValidatedUpload,
        user_password: Secret,
        /// Falls back to the user password when absent.
        owner_password: Option<Secret>,
    },
    UnlockPdf {
        document: ValidatedUpload,
        password: Secret,
    },
    PdfToOfx {
        document: ValidatedUpload,
        bank_id: String,
        account_id: String,
        account_type: OfxAccountType,
    },
    ExtractText {
        document: ValidatedUpload,
    },
    CompressImage {
        image: ValidatedUpload,
        quality: u8,
        /// Longest side after resizing; `None` keeps the original dimensions.
        max_dimension: Option<u32>,
        output: CompressionOutput,
    },
}

impl ConversionJob {
    /// Stable operation name for logs, metrics, and output filenames.
    pub fn operation(&self) -> &'static str {
        match self {
            ConversionJob::SplitPdf { .. } => "split",
            ConversionJob::MergePdfs { .. } => "merged",
            ConversionJob::ExtractPages { .. } => "extracted",
            ConversionJob::PdfInfo { .. } => "info",
            ConversionJob::PdfToImages { .. } => "images",
            ConversionJob::ImagesToPdf { .. } => "images",
            ConversionJob::ConvertImage { .. } => "converted",
            ConversionJob::Transcribe { .. } => "transcript",
            ConversionJob::CutVideo { .. } => "cut",
            ConversionJob::ProtectPdf { .. } => "protected",
            ConversionJob::UnlockPdf { .. } => "unlocked",
            ConversionJob::PdfToOfx { .. } => "statement",
            ConversionJob::ExtractText { .. } => "text",
            ConversionJob::CompressImage { .. } => "compressed",
        }
    }
}

/// Result of a conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub payload: Bytes,
    pub content_type: String,
    /// Extension of a downloadable artifact; `None` for inline JSON results.
    pub extension: Option<String>,
}

impl ConversionOutput {
    pub fn attachment(payload: impl Into<Bytes>, content_type: &str, extension: &str) -> Self {
        Self {
            payload: payload.into(),
            content_type: content_type.to_string(),
            extension: Some(extension.to_string()),
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            payload: Bytes::from(value.to_string()),
            content_type: "application/json".to_string(),
            extension: None,
        }
    }
}

/// External converter invoked only after the gate admitted the request.
pub trait ConversionBackend: Send + Sync + 'static {
    /// Number of pages in a validated PDF.
    fn page_count(&self, document: &ValidatedUpload) -> Result<u32, BackendError>;

    fn convert(&self, job: ConversionJob) -> Result<ConversionOutput, BackendError>;
}

/// Default collaborator when no converter is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredBackend;

impl ConversionBackend for UnconfiguredBackend {
    fn page_count(&self, _document: &ValidatedUpload) -> Result<u32, BackendError> {
        Err(BackendError::Unavailable)
    }

    fn convert(&self, _job: ConversionJob) -> Result<ConversionOutput, BackendError> {
        Err(BackendError::Unavailable)
    }
}
