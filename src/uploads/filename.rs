//! Filename sanitization and output naming.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Substituted when nothing usable survives sanitization.
pub const PLACEHOLDER_FILENAME: &str = "document";

const REPLACED_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

/// Characters left as-is in a `filename*` parameter (RFC 5987 attr-char minus the rest).
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Reduce an untrusted filename to a single safe path component.
///
/// Pure and deterministic:
/// - only the last `/` or `\` separated segment is kept
/// - `..` sequences and control characters are removed
/// - reserved characters (`< > : " | ? *`) become `_`
/// - leading dots and surrounding whitespace are trimmed
/// - names longer than `max_len` characters are cut, keeping the extension
/// - an empty result becomes [`PLACEHOLDER_FILENAME`]
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let last_segment = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut cleaned: String = last_segment
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if REPLACED_CHARS.contains(&c) { '_' } else { c })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "");
    }

    let cleaned = cleaned.trim().trim_start_matches('.').trim();
    if cleaned.is_empty() {
        return PLACEHOLDER_FILENAME.to_string();
    }

    truncate_keeping_extension(cleaned, max_len)
}

fn truncate_keeping_extension(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if ext.chars().count() + 1 < max_len => {
            let keep = max_len - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            // A cut that lands on a dot must not rebuild `..` against the extension.
            let stem = stem.trim_end_matches(|c: char| c == '.' || c.is_whitespace());
            format!("{stem}.{ext}")
        }
        _ => name.chars().take(max_len).collect(),
    }
}

/// Split a name into stem and lowercase extension.
pub fn split_extension(name: &str) -> (&str, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (name, None),
    }
}

/// Name for a converted artifact: `"{stem}-{operation}.{extension}"`.
pub fn output_filename(original: &str, operation: &str, extension: &str) -> String {
    let (stem, _) = split_extension(original);
    format!("{stem}-{operation}.{extension}")
}

/// `Content-Disposition` value for a download, with the name percent-encoded.
pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}",
        utf8_percent_encode(filename, FILENAME_ENCODE_SET)
    )
}
