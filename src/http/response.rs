//! Mapping of rejections and conversion results to HTTP responses.
//!
//! # Design Decisions
//! - Bodies are JSON `{ "error", "code" }` with a caller-safe message
//! - Backend detail is logged server-side only
//! - Time-bound rejections carry `Retry-After` in whole seconds

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::backend::{BackendError, ConversionOutput};
use crate::gate::Rejection;
use crate::uploads::{content_disposition, UploadError};

/// Error body returned for every rejection.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::Locked { .. } => StatusCode::FORBIDDEN,
            Rejection::Unauthorized => StatusCode::UNAUTHORIZED,
            Rejection::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Rejection::Upload(_) | Rejection::PageRange(_) | Rejection::InvalidField { .. } => {
                StatusCode::BAD_REQUEST
            }
            Rejection::Backend(BackendError::InvalidInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Rejection::Backend(BackendError::Failed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Rejection::Backend(BackendError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        if let Rejection::Backend(e) = &self {
            tracing::error!(error = %e, code = self.kind(), "Conversion backend failed");
        }

        let body = ErrorBody {
            error: self.public_message(),
            code: self.kind(),
        };
        let mut response = (self.status(), Json(body)).into_response();

        if let Some(secs) = self.retry_after_secs() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Build the success response for a conversion result.
pub fn conversion_response(output: ConversionOutput, download_name: Option<String>) -> Response {
    let content_type = HeaderValue::from_str(&output.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut response = (StatusCode::OK, output.payload).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);

    if let Some(name) = download_name {
        if let Ok(value) = HeaderValue::from_str(&content_disposition(&name)) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }
    response
}
