//! Range window arithmetic for partial-content continuation.
//!
//! The service confirms each partial response with a `Content-Range` value
//! of the form `<start>-<end>/<total>`. The next request asks for the bytes
//! directly after the confirmed `end`; once that offset reaches `total` the
//! resource is complete.

use std::fmt;
use std::str::FromStr;

use super::DownloadError;
use super::constants::{RANGE_PREFIX, SANDBOX_CHUNK_SIZE};

/// A byte interval requested in one call, plus the resource size once known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset as sent to the service.
    pub end: u64,
    /// Total resource size reported by the previous response.
    pub total: Option<u64>,
}

impl RangeWindow {
    /// The window for the very first request: `bytes=0-<chunk_size>`.
    #[must_use]
    pub fn first(chunk_size: u64) -> Self {
        Self {
            start: 0,
            end: effective_chunk_size(chunk_size),
            total: None,
        }
    }

    /// Value for the `Range` request header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{RANGE_PREFIX}{}-{}", self.start, self.end)
    }
}

impl fmt::Display for RangeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

/// A parsed `Content-Range` confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl FromStr for ContentRange {
    type Err = DownloadError;

    /// Parses `<start>-<end>/<total>`, tolerating the RFC 9110 `bytes ` unit prefix.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || DownloadError::input_data("Bad content-range header format", value);

        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("bytes ").unwrap_or(trimmed).trim();
        let (bounds, total) = trimmed.split_once('/').ok_or_else(malformed)?;
        let (start, end) = bounds.split_once('-').ok_or_else(malformed)?;

        let parse = |component: &str| component.trim().parse::<u64>().map_err(|_| malformed());
        let start = parse(start)?;
        let end = parse(end)?;
        let total = parse(total)?;

        // A confirmation that does not move forward would loop forever.
        if end < start {
            return Err(malformed());
        }

        Ok(Self { start, end, total })
    }
}

/// Computes the window following a confirmed range.
///
/// Returns `Ok(None)` when the confirmed range reached the end of the
/// resource, i.e. the next start offset is not below `total`.
/// `Content-Range` offsets are zero-based, so `end + 1 == total` means the
/// last byte has arrived and is terminal.
///
/// # Errors
///
/// Returns [`DownloadError::InputData`] when `confirmation` is not a valid
/// `start-end/total` value. This is fatal for the current retrieval.
pub fn next_window(
    confirmation: Option<&str>,
    chunk_size: u64,
) -> Result<Option<RangeWindow>, DownloadError> {
    let Some(confirmation) = confirmation else {
        return Ok(Some(RangeWindow::first(chunk_size)));
    };

    let confirmed: ContentRange = confirmation.parse()?;
    let next_start = confirmed.end.saturating_add(1);
    if next_start >= confirmed.total {
        return Ok(None);
    }

    Ok(Some(RangeWindow {
        start: next_start,
        end: next_start.saturating_add(effective_chunk_size(chunk_size)),
        total: Some(confirmed.total),
    }))
}

/// Header-string form of [`next_window`]: `Some("bytes=<start>-<end>")`, or
/// `None` once the resource is complete.
///
/// # Errors
///
/// Same as [`next_window`].
pub fn next_range_header(
    confirmation: Option<&str>,
    chunk_size: u64,
) -> Result<Option<String>, DownloadError> {
    Ok(next_window(confirmation, chunk_size)?.map(|window| window.header_value()))
}

fn effective_chunk_size(chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        SANDBOX_CHUNK_SIZE
    } else {
        chunk_size
    }
}
