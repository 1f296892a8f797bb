//! Batch ingest of a delimited feed file into the staging store.
//!
//! The file is decompressed and parsed as a stream. Rows are collected into
//! batches of at most `batch_size`, coerced column by column, and each batch
//! is written in its own transaction before the next one is parsed.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;

use csv::{ByteRecord, ReaderBuilder};
use flate2::read::MultiGzDecoder;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::FilterError;
use super::coercion::{ColumnCoercion, IngestSchema, StagedValue};
use crate::db::{STAGING_TABLE, StagingStore, quote_identifier};
use crate::feed::{FileEncoding, FileFormat};

/// Rows per ingest batch.
pub const DEFAULT_BATCH_SIZE: usize = 20_000;

/// Field separator of feed files.
pub const DEFAULT_DELIMITER: u8 = b'\t';

/// Host parameter limit of the bundled SQLite.
const SQLITE_MAX_PARAMETERS: usize = 32_766;

/// Rows per `INSERT` statement, before the parameter limit applies.
const MAX_ROWS_PER_STATEMENT: usize = 500;

pub(crate) const MISSING_INPUT_MESSAGE: &str =
    "Input file is a directory or does not exist. Cannot filter. Aborting...";

/// How to read the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    pub delimiter: u8,
    pub encoding: FileEncoding,
    pub file_format: FileFormat,
    /// Upper bound on rows held in memory before they are staged.
    pub batch_size: usize,
    /// Stage only these columns. Bypasses the ignored-column set.
    pub columns: Option<Vec<String>>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            encoding: FileEncoding::default(),
            file_format: FileFormat::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            columns: None,
        }
    }
}

/// A column as it exists in the staging table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedColumn {
    pub name: String,
    pub coercion: ColumnCoercion,
}

/// Counters from one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows written to the staging table.
    pub rows: u64,
    pub batches: u64,
    /// Rows dropped for having more fields than the header.
    pub skipped_rows: u64,
    /// Cells replaced by their column's fallback value.
    pub fallbacks: u64,
    /// Staged columns, in table order.
    pub columns: Vec<StagedColumn>,
}

/// Fails unless `path` names an existing regular file.
///
/// # Errors
///
/// Returns [`FilterError::InputData`] otherwise.
pub fn ensure_regular_file(path: &Path) -> Result<(), FilterError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(()),
        _ => Err(FilterError::input_data(
            MISSING_INPUT_MESSAGE,
            path.display().to_string(),
        )),
    }
}

/// Streams `path` into the staging table, returning what was loaded.
///
/// # Errors
///
/// Returns [`FilterError::InputData`] for a missing input, an empty header
/// or an unknown requested column, [`FilterError::Csv`]/[`FilterError::Io`]
/// for unreadable input, and [`FilterError::Database`] if staging fails.
#[instrument(skip(path, options, schema, store), fields(path = %path.display(), batch_size = options.batch_size))]
pub async fn ingest_file(
    path: &Path,
    options: &IngestOptions,
    schema: &IngestSchema,
    store: &StagingStore,
) -> Result<IngestReport, FilterError> {
    ensure_regular_file(path)?;
    let started = Instant::now();

    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(open_input(path, options.file_format)?);

    let header = reader
        .byte_headers()
        .map_err(|e| FilterError::csv(path, e))?
        .clone();
    let header_names = decode_header(&header, options.encoding);
    if header_names.iter().all(String::is_empty) {
        return Err(FilterError::input_data(
            "Input file has no header row",
            path.display().to_string(),
        ));
    }

    let selection = select_columns(&header_names, options.columns.as_deref(), schema)?;
    let columns: Vec<StagedColumn> = selection
        .iter()
        .map(|(index, coercion)| StagedColumn {
            name: header_names[*index].clone(),
            coercion: *coercion,
        })
        .collect();
    create_table(store, &columns).await?;
    let insert_prefix = insert_prefix(&columns);

    let batch_size = options.batch_size.max(1);
    let mut report = IngestReport::default();
    let mut batch: Vec<Vec<StagedValue>> = Vec::with_capacity(batch_size.min(DEFAULT_BATCH_SIZE));
    let mut record = ByteRecord::new();

    while reader
        .read_byte_record(&mut record)
        .map_err(|e| FilterError::csv(path, e))?
    {
        if record.len() > header.len() {
            report.skipped_rows += 1;
            continue;
        }

        let row = selection
            .iter()
            .map(|(index, coercion)| {
                let raw = record
                    .get(*index)
                    .map(|field| options.encoding.decode(field))
                    .unwrap_or_default();
                let coerced = coercion.coerce(raw.trim_start());
                if coerced.fell_back {
                    report.fallbacks += 1;
                }
                coerced.value
            })
            .collect();
        batch.push(row);

        if batch.len() >= batch_size {
            report.rows += stage_batch(store, &insert_prefix, columns.len(), std::mem::take(&mut batch)).await?;
            report.batches += 1;
            debug!(batch = report.batches, rows = report.rows, "staged batch");
        }
    }
    if !batch.is_empty() {
        report.rows += stage_batch(store, &insert_prefix, columns.len(), batch).await?;
        report.batches += 1;
        debug!(batch = report.batches, rows = report.rows, "staged final batch");
    }

    if report.skipped_rows > 0 {
        warn!(skipped = report.skipped_rows, "skipped rows with more fields than the header");
    }
    if report.fallbacks > 0 {
        warn!(fallbacks = report.fallbacks, "replaced malformed values with column fallbacks");
    }
    info!(
        records = report.rows,
        batches = report.batches,
        elapsed_ms = started.elapsed().as_millis(),
        "loaded feed into staging store"
    );

    report.columns = columns;
    Ok(report)
}

fn open_input(path: &Path, file_format: FileFormat) -> Result<Box<dyn Read + Send>, FilterError> {
    let file = File::open(path).map_err(|e| FilterError::io(path, e))?;
    let reader = BufReader::new(file);
    Ok(match file_format {
        FileFormat::Gzip => Box::new(MultiGzDecoder::new(reader)),
        FileFormat::Plain => Box::new(reader),
    })
}

/// Decodes header names; duplicates get a `.1`, `.2`... suffix.
fn decode_header(header: &ByteRecord, encoding: FileEncoding) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for field in header {
        let base = encoding.decode(field).trim().to_string();
        let mut name = base.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(name);
    }
    names
}

fn select_columns(
    header_names: &[String],
    requested: Option<&[String]>,
    schema: &IngestSchema,
) -> Result<Vec<(usize, ColumnCoercion)>, FilterError> {
    if let Some(requested) = requested
        && let Some(missing) = requested.iter().find(|name| !header_names.contains(*name))
    {
        return Err(FilterError::input_data(
            "Requested column is not in the feed header",
            missing.clone(),
        ));
    }

    let selection: Vec<_> = header_names
        .iter()
        .enumerate()
        .filter(|(_, name)| match requested {
            Some(requested) => requested.contains(*name),
            None => !name.is_empty() && !schema.is_ignored(name),
        })
        .map(|(index, name)| (index, schema.coercion_for(name)))
        .collect();

    if selection.is_empty() {
        return Err(FilterError::input_data("No columns left to stage", header_names.join(",")));
    }
    Ok(selection)
}

async fn create_table(store: &StagingStore, columns: &[StagedColumn]) -> Result<(), FilterError> {
    let definitions = columns
        .iter()
        .map(|column| format!("{} {}", quote_identifier(&column.name), column.coercion.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    let ddl = format!("CREATE TABLE {} ({definitions})", quote_identifier(STAGING_TABLE));
    sqlx::query(&ddl).execute(store.pool()).await?;
    Ok(())
}

fn insert_prefix(columns: &[StagedColumn]) -> String {
    let names = columns
        .iter()
        .map(|column| quote_identifier(&column.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({names}) ", quote_identifier(STAGING_TABLE))
}

/// Writes one batch inside a single transaction.
async fn stage_batch(
    store: &StagingStore,
    insert_prefix: &str,
    width: usize,
    batch: Vec<Vec<StagedValue>>,
) -> Result<u64, FilterError> {
    let rows_per_statement = (SQLITE_MAX_PARAMETERS / width.max(1)).clamp(1, MAX_ROWS_PER_STATEMENT);
    let mut staged = 0u64;
    let mut tx = store.pool().begin().await?;

    let mut rows = batch.into_iter().peekable();
    while rows.peek().is_some() {
        let chunk: Vec<Vec<StagedValue>> = rows.by_ref().take(rows_per_statement).collect();
        let mut builder = QueryBuilder::<Sqlite>::new(insert_prefix);
        builder.push_values(chunk, |mut row_builder, row| {
            for value in row {
                match value {
                    StagedValue::Bool(value) => {
                        row_builder.push_bind(value);
                    }
                    StagedValue::Float(value) => {
                        row_builder.push_bind(value);
                    }
                    StagedValue::Text(value) => {
                        row_builder.push_bind(value);
                    }
                }
            }
        });
        staged += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(staged)
}
