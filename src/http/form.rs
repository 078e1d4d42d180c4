//! Multipart form collection and field parsing.
//!
//! Parts named `file`/`files`, or carrying a filename, are uploads; every
//! other part is a text field. Nothing here inspects file content; that is
//! the validator's job.

use std::collections::HashMap;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;

use crate::gate::Rejection;
use crate::uploads::{RawUpload, UploadError};

const FILE_FIELDS: [&str; 2] = ["file", "files"];

#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<RawUpload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain the multipart body. `body_limit` is reported when the transport
    /// limit trips mid-stream.
    pub async fn read(mut multipart: Multipart, body_limit: usize) -> Result<Self, Rejection> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_rejection(e, body_limit))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            let filename = field.file_name().map(str::to_owned);

            if filename.is_some() || FILE_FIELDS.contains(&name.as_str()) {
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_rejection(e, body_limit))?;
                form.files.push(RawUpload { filename, content });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| multipart_rejection(e, body_limit))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn take_files(&mut self) -> Vec<RawUpload> {
        std::mem::take(&mut self.files)
    }

    /// The one upload of a single-file endpoint.
    pub fn single_file(&mut self) -> Result<RawUpload, Rejection> {
        match self.files.len() {
            0 => Err(UploadError::TooFewFiles { min: 1, got: 0 }.into()),
            1 => self
                .files
                .pop()
                .ok_or_else(|| UploadError::TooFewFiles { min: 1, got: 0 }.into()),
            got => Err(UploadError::TooManyFiles { max: 1, got }.into()),
        }
    }

    /// Trimmed text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &'static str) -> Result<&str, Rejection> {
        self.text(name)
            .ok_or_else(|| Rejection::invalid_field(name, "field is required"))
    }

    /// Numeric field within `range`, or `default` when absent.
    pub fn number<T>(
        &self,
        name: &'static str,
        default: Option<T>,
        range: RangeInclusive<T>,
    ) -> Result<T, Rejection>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let value = match (self.text(name), default) {
            (Some(raw), _) => raw
                .parse::<T>()
                .map_err(|_| Rejection::invalid_field(name, format!("'{raw}' is not a number")))?,
            (None, Some(default)) => default,
            (None, None) => return Err(Rejection::invalid_field(name, "field is required")),
        };

        if !range.contains(&value) {
            return Err(Rejection::invalid_field(
                name,
                format!("must be between {} and {}", range.start(), range.end()),
            ));
        }
        Ok(value)
    }

    /// Field that must be one of `options`, or `default` when absent.
    pub fn choice<'a>(
        &'a self,
        name: &'static str,
        options: &[&str],
        default: Option<&'a str>,
    ) -> Result<String, Rejection> {
        let value = match (self.text(name), default) {
            (Some(raw), _) => raw.to_ascii_lowercase(),
            (None, Some(default)) => return Ok(default.to_owned()),
            (None, None) => return Err(Rejection::invalid_field(name, "field is required")),
        };

        if options.contains(&value.as_str()) {
            Ok(value)
        } else {
            Err(Rejection::invalid_field(
                name,
                format!("must be one of: {}", options.join(", ")),
            ))
        }
    }

    /// Boolean field (`true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`), or `default` when absent.
    pub fn flag(&self, name: &'static str, default: bool) -> Result<bool, Rejection> {
        let Some(raw) = self.text(name) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(Rejection::invalid_field(name, format!("'{raw}' is not a boolean"))),
        }
    }
}

fn multipart_rejection(e: MultipartError, body_limit: usize) -> Rejection {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { limit: body_limit }.into()
    } else {
        Rejection::invalid_field("body", e.body_text())
    }
}
