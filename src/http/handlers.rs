//! Conversion endpoints.
//!
//! # Data Flow
//! ```text
//! Admitted request (Admission extension set by the middleware)
//!     → UploadForm::read (multipart → raw files + text fields)
//!     → SecurityValidator (count, size, filename, signature)
//!     → field parsing (page ranges, formats, numeric bounds)
//!     → ConversionBackend on the blocking pool
//!     → output size check → attachment or JSON response
//! ```
//!
//! Every handler returns `Result<Response, Rejection>`; `finish` turns that
//! into the audited HTTP response.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;

use crate::backend::{
    BackendError, CompressionOutput, ConversionBackend, ConversionJob, ConversionOutput,
    ImageFormat, OfxAccountType, PageLayout, RasterFormat, Secret,
};
use crate::gate::{Admission, Rejection};
use crate::http::form::UploadForm;
use crate::http::response::conversion_response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pages::{self, PageSelection};
use crate::uploads::{output_filename, ExpectedKind, ValidatedUpload};

pub const TRANSCRIBE_LANGUAGES: [&str; 15] = [
    "pt", "en", "es", "fr", "de", "it", "ja", "zh", "ko", "ru", "ar", "hi", "nl", "pl", "tr",
];

const MIN_DPI: u16 = 72;
const MAX_DPI: u16 = 600;
const DEFAULT_DPI: u16 = 150;
const MAX_IMAGES_PER_PAGE: u8 = 9;
const DEFAULT_IMAGES_PER_PAGE: u8 = 4;
const DEFAULT_QUALITY: u8 = 95;
const DEFAULT_COMPRESS_QUALITY: u8 = 70;
/// Largest side a JPEG can encode.
const MAX_IMAGE_DIMENSION: u32 = 65_535;
/// PDF 2.0 caps passwords at 127 bytes of UTF-8.
const MAX_PASSWORD_BYTES: usize = 127;
/// OFX `ACCTID` is at most 22 characters; `BANKID` fits inside that.
const MAX_OFX_ID_LEN: usize = 22;
const DEFAULT_BANK_ID: &str = "0000";
const DEFAULT_ACCOUNT_ID: &str = "0000000000";

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

pub async fn split_pdf(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "split", split_pdf_inner(state, multipart).await)
}

async fn split_pdf_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let document = validate_one(&state, &mut form, ExpectedKind::Pdf)?;
    let expression = form.required("pages")?.to_owned();

    let pages = select_pages(&state, &document, &expression).await?;
    run(&state, ConversionJob::SplitPdf { document, pages }).await
}

pub async fn merge_pdfs(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "merge", merge_pdfs_inner(state, multipart).await)
}

async fn merge_pdfs_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let documents = validate_many(&state, &mut form, ExpectedKind::Pdf, 2)?;
    run(&state, ConversionJob::MergePdfs { documents }).await
}

pub async fn extract_pages(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "extract-pages", extract_pages_inner(state, multipart).await)
}

async fn extract_pages_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let document = validate_one(&state, &mut form, ExpectedKind::Pdf)?;
    run(&state, ConversionJob::ExtractPages { document }).await
}

pub async fn pdf_info(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "info", pdf_info_inner(state, multipart).await)
}

async fn pdf_info_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let document = validate_one(&state, &mut form, ExpectedKind::Pdf)?;
    run(&state, ConversionJob::PdfInfo { document }).await
}

pub async fn pdf_to_images(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "convert-to-image", pdf_to_images_inner(state, multipart).await)
}

async fn pdf_to_images_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let document = validate_one(&state, &mut form, ExpectedKind::Pdf)?;

    let format = match form.choice("format", &["png", "jpeg", "tiff"], Some("png"))?.as_str() {
        "jpeg" => RasterFormat::Jpeg,
        "tiff" => RasterFormat::Tiff,
        _ => RasterFormat::Png,
    };
    let dpi = form.number("dpi", Some(DEFAULT_DPI), MIN_DPI..=MAX_DPI)?;
    let pages = match form.text("pages").map(str::to_owned) {
        Some(expression) => Some(select_pages(&state, &document, &expression).await?),
        None => None,
    };

    run(
        &state,
        ConversionJob::PdfToImages {
            document,
            format,
            dpi,
            pages,
        },
    )
    .await
}

pub async fn images_to_pdf(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "to-pdf", images_to_pdf_inner(state, multipart).await)
}

async fn images_to_pdf_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let images = validate_many(&state, &mut form, ExpectedKind::Image, 1)?;

    let layout = match form.choice("layout", &["single", "grouped"], Some("single"))?.as_str() {
        "grouped" => PageLayout::Grouped {
            per_page: form.number(
                "images_per_page",
                Some(DEFAULT_IMAGES_PER_PAGE),
                1..=MAX_IMAGES_PER_PAGE,
            )?,
        },
        _ => PageLayout::Single,
    };

    run(&state, ConversionJob::ImagesToPdf { images, layout }).await
}

pub async fn convert_image(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "convert", convert_image_inner(state, multipart).await)
}

async fn convert_image_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let image = validate_one(&state, &mut form, ExpectedKind::Image)?;

    let format = match form
        .choice("format", &["jpeg", "jpg", "png", "webp", "gif", "bmp", "tiff"], None)?
        .as_str()
    {
        "png" => ImageFormat::Png,
        "webp" => ImageFormat::Webp,
        "gif" => ImageFormat::Gif,
        "bmp" => ImageFormat::Bmp,
        "tiff" => ImageFormat::Tiff,
        _ => ImageFormat::Jpeg,
    };
    let quality = form.number("quality", Some(DEFAULT_QUALITY), 1..=100)?;

    run(
        &state,
        ConversionJob::ConvertImage {
            image,
            format,
            quality,
        },
    )
    .await
}

pub async fn transcribe(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "transcribe", transcribe_inner(state, multipart).await)
}

async fn transcribe_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let media = validate_one(&state, &mut form, ExpectedKind::Media)?;

    let language = match form.text("language") {
        Some(_) => Some(form.choice("language", &TRANSCRIBE_LANGUAGES, None)?),
        None => None,
    };

    run(&state, ConversionJob::Transcribe { media, language }).await
}

pub async fn cut_video(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "cut", cut_video_inner(state, multipart).await)
}

async fn cut_video_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let video = validate_one(&state, &mut form, ExpectedKind::Video)?;

    let start_secs = form.number::<f64>("start", None, 0.0..=f64::MAX)?;
    let end_secs = form.number::<f64>("end", None, 0.0..=f64::MAX)?;
    if end_secs <= start_secs {
        return Err(Rejection::invalid_field("end", "must be greater than start"));
    }

    run(
        &state,
        ConversionJob::CutVideo {
            video,
            start_secs,
            end_secs,
        },
    )
    .await
}

pub async fn add_password(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "add-password", add_password_inner(state, multipart).await)
}

async fn add_password_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let document = validate_one(&state, &mut form, ExpectedKind::Pdf)?;

    let user_password = password(&form, "user_password")?;
    let owner_password = match form.text("owner_password") {
        Some(_) => Some(password(&form, "owner_password")?),
        None => None,
    };

    run(
        &state,
        ConversionJob::ProtectPdf {
            document,
            user_password,
            owner_password,
        },
    )
    .await
}

pub async fn remove_password(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "remove-password", remove_password_inner(state, multipart).await)
}

async fn remove_password_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let document = validate_one(&state, &mut form, ExpectedKind::Pdf)?;
    let password = password(&form, "password")?;
    run(&state, ConversionJob::UnlockPdf { document, password }).await
}

pub async fn pdf_to_ofx(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "convert-to-ofx", pdf_to_ofx_inner(state, multipart).await)
}

async fn pdf_to_ofx_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let document = validate_one(&state, &mut form, ExpectedKind::Pdf)?;

    let bank_id = ofx_identifier(&form, "bank_id", DEFAULT_BANK_ID)?;
    let account_id = ofx_identifier(&form, "account_id", DEFAULT_ACCOUNT_ID)?;
    let account_type = match form
        .choice("account_type", &["checking", "savings", "creditcard"], Some("checking"))?
        .as_str()
    {
        "savings" => OfxAccountType::Savings,
        "creditcard" => OfxAccountType::CreditCard,
        _ => OfxAccountType::Checking,
    };

    run(
        &state,
        ConversionJob::PdfToOfx {
            document,
            bank_id,
            account_id,
            account_type,
        },
    )
    .await
}

pub async fn extract_text(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "extract-text", extract_text_inner(state, multipart).await)
}

async fn extract_text_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let document = validate_one(&state, &mut form, ExpectedKind::Pdf)?;
    run(&state, ConversionJob::ExtractText { document }).await
}

pub async fn compress_image(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "compress", compress_image_inner(state, multipart).await)
}

async fn compress_image_inner(state: AppState, multipart: Multipart) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let image = validate_one(&state, &mut form, ExpectedKind::Image)?;

    let output = match form.choice("response_type", &["file", "json"], Some("file"))?.as_str() {
        "json" => CompressionOutput::Metrics { include_file: true },
        _ => CompressionOutput::File,
    };
    compress(&state, &form, image, output).await
}

pub async fn compress_image_info(
    State(state): State<AppState>,
    Extension(admission): Extension<Admission>,
    multipart: Multipart,
) -> Response {
    finish(&admission, "compress-info", compress_image_info_inner(state, multipart).await)
}

async fn compress_image_info_inner(
    state: AppState,
    multipart: Multipart,
) -> Result<Response, Rejection> {
    let mut form = read_form(&state, multipart).await?;
    let image = validate_one(&state, &mut form, ExpectedKind::Image)?;

    let include_file = form.flag("include_file", false)?;
    compress(&state, &form, image, CompressionOutput::Metrics { include_file }).await
}

async fn compress(
    state: &AppState,
    form: &UploadForm,
    image: ValidatedUpload,
    output: CompressionOutput,
) -> Result<Response, Rejection> {
    let quality = form.number("quality", Some(DEFAULT_COMPRESS_QUALITY), 1..=100)?;
    let max_dimension = match form.text("max_dimension") {
        Some(_) => Some(form.number("max_dimension", None, 1..=MAX_IMAGE_DIMENSION)?),
        None => None,
    };

    run(
        state,
        ConversionJob::CompressImage {
            image,
            quality,
            max_dimension,
            output,
        },
    )
    .await
}

/// A required password field. The value itself never appears in a rejection.
fn password(form: &UploadForm, name: &'static str) -> Result<Secret, Rejection> {
    let value = form.required(name)?;
    if value.len() > MAX_PASSWORD_BYTES {
        return Err(Rejection::invalid_field(
            name,
            format!("must be at most {MAX_PASSWORD_BYTES} bytes"),
        ));
    }
    Ok(Secret::new(value))
}

/// Bank or account identifier for an OFX header: ASCII letters, digits and `-`.
fn ofx_identifier(form: &UploadForm, name: &'static str, default: &str) -> Result<String, Rejection> {
    let value = form.text(name).unwrap_or(default);
    let well_formed = value.len() <= MAX_OFX_ID_LEN
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !well_formed {
        return Err(Rejection::invalid_field(
            name,
            format!("must be up to {MAX_OFX_ID_LEN} letters, digits or '-'"),
        ));
    }
    Ok(value.to_owned())
}

async fn read_form(state: &AppState, multipart: Multipart) -> Result<UploadForm, Rejection> {
    UploadForm::read(multipart, state.validator.limits().max_aggregate_bytes).await
}

fn validate_one(
    state: &AppState,
    form: &mut UploadForm,
    expected: ExpectedKind,
) -> Result<ValidatedUpload, Rejection> {
    let upload = state.validator.validate(form.single_file()?, expected)?;
    log_accepted(&upload);
    Ok(upload)
}

fn validate_many(
    state: &AppState,
    form: &mut UploadForm,
    expected: ExpectedKind,
    min_files: usize,
) -> Result<Vec<ValidatedUpload>, Rejection> {
    let uploads = state
        .validator
        .validate_batch(form.take_files(), expected, min_files)?;
    uploads.iter().for_each(log_accepted);
    Ok(uploads)
}

fn log_accepted(upload: &ValidatedUpload) {
    tracing::info!(
        filename = %upload.sanitized_filename(),
        kind = %upload.detected_kind(),
        bytes = upload.content().len(),
        fingerprint = %upload.fingerprint(),
        "Upload accepted"
    );
}

/// Parse a page expression against the document's real page count.
async fn select_pages(
    state: &AppState,
    document: &ValidatedUpload,
    expression: &str,
) -> Result<PageSelection, Rejection> {
    let probe = document.clone();
    let total = on_blocking_pool(state.backend.clone(), move |backend| {
        backend.page_count(&probe)
    })
    .await?;
    Ok(pages::parse(expression, total)?)
}

/// Execute a job and shape the response. The download name derives from the
/// first input's sanitized name.
async fn run(state: &AppState, job: ConversionJob) -> Result<Response, Rejection> {
    let operation = job.operation();
    let source = primary_filename(&job);

    let output: ConversionOutput =
        on_blocking_pool(state.backend.clone(), move |backend| backend.convert(job)).await?;
    state.validator.check_output_size(output.payload.len())?;

    let download_name = output
        .extension
        .as_deref()
        .map(|ext| output_filename(&source, operation, ext));
    Ok(conversion_response(output, download_name))
}

fn primary_filename(job: &ConversionJob) -> String {
    let first = match job {
        ConversionJob::SplitPdf { document, .. }
        | ConversionJob::ExtractPages { document }
        | ConversionJob::PdfInfo { document }
        | ConversionJob::PdfToImages { document, .. }
        | ConversionJob::ProtectPdf { document, .. }
        | ConversionJob::UnlockPdf { document, .. }
        | ConversionJob::PdfToOfx { document, .. }
        | ConversionJob::ExtractText { document } => Some(document),
        ConversionJob::MergePdfs { documents } => documents.first(),
        ConversionJob::ImagesToPdf { images, .. } => images.first(),
        ConversionJob::ConvertImage { image, .. } | ConversionJob::CompressImage { image, .. } => {
            Some(image)
        }
        ConversionJob::Transcribe { media, .. } => Some(media),
        ConversionJob::CutVideo { video, .. } => Some(video),
    };
    first
        .map(|upload| upload.sanitized_filename().to_owned())
        .unwrap_or_else(|| crate::uploads::filename::PLACEHOLDER_FILENAME.to_owned())
}

/// Run backend work on tokio's blocking pool.
///
/// Blocking tasks cannot be cancelled. When the request timeout fires, the
/// response future (and this join handle) is dropped but the conversion runs
/// to completion and its output is discarded. Each admitted request holds at
/// most one blocking thread, so the rate limit bounds how much abandoned work
/// can pile up.
async fn on_blocking_pool<T, F>(backend: Arc<dyn ConversionBackend>, work: F) -> Result<T, Rejection>
where
    T: Send + 'static,
    F: FnOnce(&dyn ConversionBackend) -> Result<T, BackendError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(backend.as_ref()))
        .await
        .map_err(|e| BackendError::Failed(format!("conversion task aborted: {e}")))?
        .map_err(Rejection::from)
}

/// Audit the outcome and render it.
fn finish(admission: &Admission, endpoint: &'static str, result: Result<Response, Rejection>) -> Response {
    match result {
        Ok(response) => {
            tracing::info!(
                client = %admission.client_key,
                endpoint,
                status = response.status().as_u16(),
                "Conversion completed"
            );
            response
        }
        Err(rejection) => {
            if matches!(rejection, Rejection::Upload(_)) {
                metrics::record_upload_rejected(rejection.kind());
            }
            tracing::warn!(
                client = %admission.client_key,
                endpoint,
                outcome = rejection.kind(),
                "Request rejected"
            );
            rejection.into_response()
        }
    }
}
