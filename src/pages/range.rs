//! Parser for human-written page ranges.

use std::collections::HashSet;

use serde::Serialize;

/// Why a page-range expression was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageRangeError {
    #[error("malformed page range '{token}'")]
    MalformedRange { token: String },
    #[error("page {page} is outside 1..={total_pages}")]
    OutOfBounds { page: u64, total_pages: u32 },
}

/// Ordered, duplicate-free 1-based page indices, each within the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageSelection(Vec<u32>);

impl PageSelection {
    pub fn pages(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

/// Parse `expression` against a document of `total_pages` pages.
///
/// Grammar: comma-separated tokens, each `N` or `A-B` with `A <= B`.
/// Whitespace around numbers is ignored.
pub fn parse(expression: &str, total_pages: u32) -> Result<PageSelection, PageRangeError> {
    let mut pages = Vec::new();
    let mut seen = HashSet::new();

    for token in expression.split(',') {
        let (start, end) = parse_token(token)?;
        for bound in [start, end] {
            if bound < 1 || bound > u64::from(total_pages) {
                return Err(PageRangeError::OutOfBounds {
                    page: bound,
                    total_pages,
                });
            }
        }

        // Bounds were checked above, so both fit in u32 and the expansion is bounded by the document.
        for page in start as u32..=end as u32 {
            if seen.insert(page) {
                pages.push(page);
            }
        }
    }

    Ok(PageSelection(pages))
}

fn parse_token(token: &str) -> Result<(u64, u64), PageRangeError> {
    let malformed = || PageRangeError::MalformedRange {
        token: token.trim().to_string(),
    };

    let (start, end) = match token.split_once('-') {
        Some((a, b)) => (parse_number(a).ok_or_else(malformed)?, parse_number(b).ok_or_else(malformed)?),
        None => {
            let n = parse_number(token).ok_or_else(malformed)?;
            (n, n)
        }
    };

    if start > end {
        return Err(malformed());
    }
    Ok((start, end))
}

/// Digits only; values too large for u64 saturate so they fail the bounds check.
fn parse_number(raw: &str) -> Option<u64> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}
