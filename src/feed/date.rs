//! Feed date formats.
//!
//! Item feeds are dated `yyyyMMdd`; snapshot feeds carry a full UTC
//! timestamp `yyyy-MM-ddTHH:mm:ssZ`.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

use super::FeedType;
use crate::download::DownloadError;

const ITEM_DATE_FORMAT: &str = "%Y%m%d";
const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Returns today's date (shifted by `day_delta` days) formatted for `feed_type`.
#[must_use]
pub fn formatted_feed_date(feed_type: FeedType, day_delta: i64) -> String {
    let date = Local::now() + Duration::days(day_delta);
    match feed_type {
        FeedType::Item => date.format(ITEM_DATE_FORMAT).to_string(),
        FeedType::Snapshot => date.format(SNAPSHOT_DATE_FORMAT).to_string(),
    }
}

/// Checks that `feed_date` is in the format required by `feed_type`.
///
/// # Errors
///
/// Returns [`DownloadError::InputData`] naming the expected format.
pub fn validate_feed_date(feed_date: &str, feed_type: FeedType) -> Result<(), DownloadError> {
    match feed_type {
        FeedType::Item => NaiveDate::parse_from_str(feed_date, ITEM_DATE_FORMAT)
            .map(|_| ())
            .map_err(|_| {
                DownloadError::input_data(
                    "Bad feed date format. Date should be in yyyyMMdd format",
                    feed_date,
                )
            }),
        FeedType::Snapshot => NaiveDateTime::parse_from_str(feed_date, SNAPSHOT_DATE_FORMAT)
            .map(|_| ())
            .map_err(|_| {
                DownloadError::input_data(
                    "Bad feed date format. Date should be in UTC format (yyyy-MM-ddThh:00:00.000Z)",
                    feed_date,
                )
            }),
    }
}
