//! Row-level filtering of downloaded feed files.
//!
//! A filter call stages the whole input file in a transient SQLite store,
//! runs one `SELECT` built from the caller's [`FilterCriteria`], and writes
//! the matching rows to a sibling file in the input's own format.
//!
//! ```text
//! input.gz --ingest (batches)--> staging "feed" table --SELECT WHERE--> input-filtered-<millis>.gz
//! ```
//!
//! # Example
//!
//! ```no_run
//! use feed_sdk::filter::{FeedFilter, FilterCriteria, FilterRequest};
//!
//! # async fn example() {
//! let request = FilterRequest::new(
//!     "item_daily_1_20190127_EBAY_US.gz",
//!     FilterCriteria::new().with_price_upper_limit(10.0),
//! );
//! let result = FeedFilter::default().filter(&request).await;
//! println!("{} of {} rows matched", result.records_matched, result.records_read);
//! # }
//! ```

pub mod coercion;
mod criteria;
mod error;
pub mod ingest;
pub mod predicate;
pub mod query;
#[cfg(test)]
pub(crate) mod test_fixtures;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info, instrument};

pub use coercion::{ColumnCoercion, IngestSchema};
pub use criteria::FilterCriteria;
pub use error::FilterError;
pub use ingest::{DEFAULT_BATCH_SIZE, DEFAULT_DELIMITER, IngestOptions, IngestReport};
pub use predicate::Predicate;
pub use query::{ExportTarget, QueryOutcome, filtered_file_path};

use crate::db::{DEFAULT_STAGING_FILE, StagingStore};
use crate::feed::{FileEncoding, FileFormat};
use crate::result::{ResultCode, SUCCESS_MESSAGE};

/// Reading, staging and retention options for one filter call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub ingest: IngestOptions,
    /// Keep the staging database after the call.
    pub keep_staging: bool,
    /// Staging database location; defaults to `feed_staging.db` next to the input.
    pub staging_path: Option<PathBuf>,
}

impl FilterOptions {
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.ingest.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: FileEncoding) -> Self {
        self.ingest.encoding = encoding;
        self
    }

    #[must_use]
    pub fn with_file_format(mut self, file_format: FileFormat) -> Self {
        self.ingest.file_format = file_format;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.ingest.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingest.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_keep_staging(mut self, keep: bool) -> Self {
        self.keep_staging = keep;
        self
    }

    #[must_use]
    pub fn with_staging_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_path = Some(path.into());
        self
    }
}

/// Input file plus criteria and options for one filter call.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRequest {
    pub input_path: PathBuf,
    pub criteria: FilterCriteria,
    pub options: FilterOptions,
}

impl FilterRequest {
    #[must_use]
    pub fn new(input_path: impl Into<PathBuf>, criteria: FilterCriteria) -> Self {
        Self {
            input_path: input_path.into(),
            criteria,
            options: FilterOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: FilterOptions) -> Self {
        self.options = options;
        self
    }

    fn staging_path(&self) -> PathBuf {
        self.options.staging_path.clone().unwrap_or_else(|| {
            self.input_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(DEFAULT_STAGING_FILE)
        })
    }
}

/// Outcome of one filter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub status: ResultCode,
    pub message: String,
    /// Filtered output; `None` on failure or when nothing matched.
    pub file_path: Option<PathBuf>,
    /// Predicate clauses in the order they were combined.
    pub applied_filters: Vec<String>,
    pub records_read: u64,
    pub records_matched: u64,
    /// Retained staging database, when retention was requested.
    pub staging_path: Option<PathBuf>,
}

impl FilterResult {
    fn failure(error: &FilterError, applied_filters: Vec<String>) -> Self {
        Self {
            status: ResultCode::Failure,
            message: error.to_string(),
            file_path: None,
            applied_filters,
            records_read: 0,
            records_matched: 0,
            staging_path: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// What a successful staging + query pass produced.
struct FilterRun {
    report: IngestReport,
    outcome: QueryOutcome,
    staging_path: Option<PathBuf>,
}

/// Stages and filters feed files.
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    schema: IngestSchema,
}

impl FeedFilter {
    #[must_use]
    pub fn new(schema: IngestSchema) -> Self {
        Self { schema }
    }

    /// Filters `request.input_path` by `request.criteria`.
    ///
    /// Never fails outright; problems are reported through the returned
    /// [`FilterResult`]. The input path is checked first, then the criteria.
    #[instrument(skip(self, request), fields(input = %request.input_path.display()))]
    pub async fn filter(&self, request: &FilterRequest) -> FilterResult {
        info!(criteria = %request.criteria, "filtering feed file");

        let predicate = Predicate::from_criteria(&request.criteria);
        let checked = ingest::ensure_regular_file(&request.input_path).and_then(|()| {
            predicate.joined().ok_or(FilterError::NoFilters)
        });
        let where_clause = match checked {
            Ok(where_clause) => where_clause,
            Err(e) => {
                error!(error = %e, "filter request rejected");
                return FilterResult::failure(&e, predicate.into_clauses());
            }
        };
        info!(predicate = %where_clause, "applying filters");

        match self.run(request, &where_clause).await {
            Ok(run) => {
                if run.outcome.output_path.is_none() {
                    info!("no rows matched; no filtered file created");
                }
                FilterResult {
                    status: ResultCode::Success,
                    message: SUCCESS_MESSAGE.to_string(),
                    file_path: run.outcome.output_path,
                    applied_filters: predicate.into_clauses(),
                    records_read: run.report.rows,
                    records_matched: run.outcome.matched,
                    staging_path: run.staging_path,
                }
            }
            Err(e) => {
                error!(error = %e, "filtering failed");
                FilterResult::failure(&e, predicate.into_clauses())
            }
        }
    }

    async fn run(&self, request: &FilterRequest, where_clause: &str) -> Result<FilterRun, FilterError> {
        let store = StagingStore::create(&request.staging_path()).await?;
        let staged = self.stage_and_query(&store, request, where_clause).await;
        let retained = store.close(request.options.keep_staging).await;

        let (report, outcome) = staged?;
        Ok(FilterRun {
            report,
            outcome,
            staging_path: retained?,
        })
    }

    async fn stage_and_query(
        &self,
        store: &StagingStore,
        request: &FilterRequest,
        where_clause: &str,
    ) -> Result<(IngestReport, QueryOutcome), FilterError> {
        let ingest_options = &request.options.ingest;
        let report = ingest::ingest_file(&request.input_path, ingest_options, &self.schema, store).await?;

        let target = ExportTarget {
            path: filtered_file_path(
                &request.input_path,
                ingest_options.file_format,
                epoch_millis(),
            ),
            delimiter: ingest_options.delimiter,
            file_format: ingest_options.file_format,
        };
        let outcome = query::export_matches(store, where_clause, &report.columns, &target).await?;
        Ok((report, outcome))
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
