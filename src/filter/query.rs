//! Predicate execution against the staging store and export of matches.
//!
//! Matching rows are streamed out of SQLite and written as they arrive. The
//! output file is only created once the first row shows up, so a query with
//! no matches leaves nothing behind. A query that fails after the file was
//! opened removes it again.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use flate2::Compression;
use flate2::write::GzEncoder;
use futures_util::TryStreamExt;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::{debug, info, instrument, warn};

use super::FilterError;
use super::coercion::ColumnCoercion;
use super::ingest::StagedColumn;
use crate::db::{STAGING_TABLE, StagingStore, quote_identifier};
use crate::feed::FileFormat;

#[cfg(windows)]
const LINE_TERMINATOR: Terminator = Terminator::CRLF;
#[cfg(not(windows))]
const LINE_TERMINATOR: Terminator = Terminator::Any(b'\n');

/// Where and how matched rows are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub path: PathBuf,
    pub delimiter: u8,
    pub file_format: FileFormat,
}

/// What a query produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    pub matched: u64,
    /// Set only when at least one row matched.
    pub output_path: Option<PathBuf>,
}

/// Output location for a filtered copy of `input`:
/// `<dir>/<name up to the first dot>-filtered-<epoch_millis><ext>`.
#[must_use]
pub fn filtered_file_path(input: &Path, file_format: FileFormat, epoch_millis: u128) -> PathBuf {
    let directory = input.parent().unwrap_or_else(|| Path::new(""));
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    directory.join(format!(
        "{stem}-filtered-{epoch_millis}{}",
        file_format.extension()
    ))
}

/// Runs `SELECT * FROM feed WHERE <predicate>` and writes every match to `target`.
///
/// # Errors
///
/// Returns [`FilterError::Database`] if the predicate does not execute and
/// [`FilterError::Io`]/[`FilterError::Csv`] if the output cannot be written.
#[instrument(skip(store, columns, target), fields(output = %target.path.display()))]
pub async fn export_matches(
    store: &StagingStore,
    predicate: &str,
    columns: &[StagedColumn],
    target: &ExportTarget,
) -> Result<QueryOutcome, FilterError> {
    let sql = format!(
        "SELECT * FROM {} WHERE {predicate}",
        quote_identifier(STAGING_TABLE)
    );
    debug!(%sql, "executing filter query");
    let started = Instant::now();

    let mut opened = false;
    let outcome = match write_matches(store, &sql, columns, target, &mut opened).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if opened {
                discard_output(&target.path);
            }
            return Err(e);
        }
    };

    info!(
        matched = outcome.matched,
        elapsed_ms = started.elapsed().as_millis(),
        "filtered staging store"
    );
    Ok(outcome)
}

/// Streams matches into `target`, setting `opened` once the file exists.
async fn write_matches(
    store: &StagingStore,
    sql: &str,
    columns: &[StagedColumn],
    target: &ExportTarget,
    opened: &mut bool,
) -> Result<QueryOutcome, FilterError> {
    let mut rows = sqlx::query(sql).fetch(store.pool());
    let mut writer: Option<csv::Writer<OutputSink>> = None;
    let mut matched = 0u64;

    while let Some(row) = rows.try_next().await? {
        if writer.is_none() {
            *opened = true;
            writer = Some(open_writer(target, columns)?);
        }
        let record = render_row(&row, columns)?;
        if let Some(writer) = writer.as_mut() {
            writer
                .write_record(&record)
                .map_err(|e| FilterError::csv(&target.path, e))?;
        }
        matched += 1;
    }

    let output_path = match writer {
        Some(writer) => {
            let sink = writer
                .into_inner()
                .map_err(|e| FilterError::io(&target.path, e.into_error()))?;
            sink.finish()
                .map_err(|e| FilterError::io(&target.path, e))?;
            Some(target.path.clone())
        }
        None => None,
    };

    Ok(QueryOutcome {
        matched,
        output_path,
    })
}

fn discard_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial filter output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial filter output"),
    }
}

fn open_writer(
    target: &ExportTarget,
    columns: &[StagedColumn],
) -> Result<csv::Writer<OutputSink>, FilterError> {
    let file = File::create(&target.path).map_err(|e| FilterError::io(&target.path, e))?;
    let buffered = BufWriter::with_capacity(128 * 1024, file);
    let sink = match target.file_format {
        FileFormat::Gzip => OutputSink::Gzip(GzEncoder::new(buffered, Compression::default())),
        FileFormat::Plain => OutputSink::Plain(buffered),
    };

    let mut writer = WriterBuilder::new()
        .delimiter(target.delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .terminator(LINE_TERMINATOR)
        .from_writer(sink);
    writer
        .write_record(columns.iter().map(|column| column.name.as_str()))
        .map_err(|e| FilterError::csv(&target.path, e))?;
    Ok(writer)
}

/// Renders one staged row back to text; NULL becomes an empty field.
fn render_row(row: &SqliteRow, columns: &[StagedColumn]) -> Result<Vec<String>, FilterError> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| -> Result<String, FilterError> {
            Ok(match column.coercion {
                ColumnCoercion::Bool => row
                    .try_get_unchecked::<Option<bool>, _>(index)?
                    .map(|value| value.to_string())
                    .unwrap_or_default(),
                ColumnCoercion::FloatOrMax | ColumnCoercion::FloatOrZero => row
                    .try_get_unchecked::<Option<f64>, _>(index)?
                    .map(format_float)
                    .unwrap_or_default(),
                ColumnCoercion::Text => row
                    .try_get_unchecked::<Option<String>, _>(index)?
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Integral values keep one decimal (`5.0`), like the numeric columns of the input.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

enum OutputSink {
    Gzip(GzEncoder<BufWriter<File>>),
    Plain(BufWriter<File>),
}

impl OutputSink {
    fn finish(self) -> io::Result<()> {
        match self {
            Self::Gzip(encoder) => encoder.finish()?.flush(),
            Self::Plain(mut writer) => writer.flush(),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(encoder) => encoder.write(buf),
            Self::Plain(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Gzip(encoder) => encoder.flush(),
            Self::Plain(writer) => writer.flush(),
        }
    }
}
