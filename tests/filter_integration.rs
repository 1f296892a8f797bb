//! Integration tests for feed filtering through the public API.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use feed_sdk::feed::FeedColumn;
use feed_sdk::filter::predicate::numbers_in_clause;
use feed_sdk::filter::{ColumnCoercion, IngestSchema};
use feed_sdk::{FeedFilter, FileFormat, FilterCriteria, FilterOptions, FilterRequest, ResultCode};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tempfile::TempDir;

const HEADER: &str = "ItemId\tTitle\tCategoryId\tSellerUsername\tGTIN\tEPID\tPriceValue\tItemLocationCountry\tInferredEPID\tReturnsAccepted\tEstimatedAvailableQuantity";

fn rows() -> Vec<&'static str> {
    vec![
        "v1|1|0\tRed shoes\t11\talice\t001\tE1\t5.5\tUS\tI1\ttrue\t4",
        "v1|2|0\tBlue shoes\t12\tbob\t002\tE2\t15\tDE\tI2\tfalse\t",
        "v1|3|0\tGreen, hat\t11\tcarol\t003\tE3\t25\tUS\tI3\tyes\tmany",
        "v1|4|0\tO'Neil cap\t13\to'neil\t004\tE4\t9.99\tGB\tI4\tno\t1",
    ]
}

fn write_gz(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::fast());
    for line in lines {
        writeln!(encoder, "{line}").unwrap();
    }
    encoder.finish().unwrap();
    path
}

fn feed(dir: &Path) -> PathBuf {
    let mut lines = vec![HEADER];
    lines.extend(rows());
    write_gz(dir, "item_daily_1_20190127_EBAY_US.gz", &lines)
}

fn read_output(path: &Path) -> Vec<String> {
    let mut text = String::new();
    GzDecoder::new(std::fs::File::open(path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    text.lines().map(ToString::to_string).collect()
}

async fn run(input: &Path, criteria: FilterCriteria) -> feed_sdk::FilterResult {
    FeedFilter::default()
        .filter(&FilterRequest::new(input, criteria))
        .await
}

#[tokio::test]
async fn test_combined_criteria_are_anded() {
    let temp_dir = TempDir::new().unwrap();
    let input = feed(temp_dir.path());

    let result = run(
        &input,
        FilterCriteria::new()
            .with_leaf_category_ids(["11", "13"])
            .with_item_location_countries(["US", "GB"])
            .with_price_upper_limit(20.0),
    )
    .await;

    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.records_read, 4);
    assert_eq!(result.records_matched, 2);
    assert_eq!(
        result.applied_filters,
        [
            "CategoryId IN ('11','13')",
            "PriceValue <= 20",
            "ItemLocationCountry IN ('US','GB')",
        ]
    );
    let lines = read_output(&result.file_path.unwrap());
    assert_eq!(lines.len(), 3);
    assert!(!lines[0].contains("Title"), "ignored column staged: {}", lines[0]);
    assert!(lines[1].starts_with("\"v1|1|0\""));
    assert!(lines[2].starts_with("\"v1|4|0\""));
}

#[tokio::test]
async fn test_quoted_seller_name_matches() {
    let temp_dir = TempDir::new().unwrap();
    let input = feed(temp_dir.path());

    let result = run(&input, FilterCriteria::new().with_seller_names(["o'neil"])).await;

    assert_eq!(result.records_matched, 1);
}

#[tokio::test]
async fn test_identifier_filters() {
    let temp_dir = TempDir::new().unwrap();
    let input = feed(temp_dir.path());

    for (criteria, expected) in [
        (FilterCriteria::new().with_item_ids(["v1|2|0", "v1|3|0"]), 2),
        (FilterCriteria::new().with_gtins(["001"]), 1),
        (FilterCriteria::new().with_epids(["E4", "E9"]), 1),
        (FilterCriteria::new().with_inferred_epids(["I1", "I2", "I3"]), 3),
        (FilterCriteria::new().with_price_lower_limit(10.0), 2),
    ] {
        let result = run(&input, criteria.clone()).await;
        assert!(result.is_success(), "{criteria}: {}", result.message);
        assert_eq!(result.records_matched, expected, "{criteria}");
    }
}

#[tokio::test]
async fn test_free_form_query_sees_coerced_types() {
    let temp_dir = TempDir::new().unwrap();
    let input = feed(temp_dir.path());

    let result = run(
        &input,
        FilterCriteria::new().with_any_query("ReturnsAccepted = 1 AND EstimatedAvailableQuantity > 100"),
    )
    .await;

    assert!(result.is_success(), "{}", result.message);
    // Malformed quantity "many" falls back to the max-int sentinel.
    assert_eq!(result.records_matched, 1);
    assert_eq!(result.applied_filters.len(), 1);
}

#[tokio::test]
async fn test_plain_format_with_custom_delimiter() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("feed.csv");
    std::fs::write(&input, "ItemId,PriceValue\n1,5\n2,50\n").unwrap();

    let request = FilterRequest::new(&input, FilterCriteria::new().with_price_lower_limit(10.0))
        .with_options(
            FilterOptions::default()
                .with_file_format(FileFormat::Plain)
                .with_delimiter(b','),
        );
    let result = FeedFilter::default().filter(&request).await;

    assert!(result.is_success(), "{}", result.message);
    let output = result.file_path.unwrap();
    assert!(
        output
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("feed-filtered-")
    );
    assert_eq!(
        std::fs::read_to_string(output).unwrap(),
        "\"ItemId\",\"PriceValue\"\n\"2\",\"50.0\"\n"
    );
}

#[tokio::test]
async fn test_explicit_columns_and_custom_schema() {
    let temp_dir = TempDir::new().unwrap();
    let input = feed(temp_dir.path());

    let request = FilterRequest::new(&input, FilterCriteria::new().with_any_query("CategoryId > 11"))
        .with_options(FilterOptions::default().with_columns(["ItemId", "CategoryId"]));
    let schema = IngestSchema::default().with_coercion("CategoryId", ColumnCoercion::FloatOrZero);
    let result = FeedFilter::new(schema).filter(&request).await;

    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.records_matched, 2);
    let lines = read_output(&result.file_path.unwrap());
    assert_eq!(lines[0], "\"ItemId\"\t\"CategoryId\"");
    assert_eq!(lines[1], "\"v1|2|0\"\t\"12.0\"");
}

#[tokio::test]
async fn test_numeric_membership_against_numeric_staged_column() {
    let temp_dir = TempDir::new().unwrap();
    let input = feed(temp_dir.path());

    let clause = numbers_in_clause(FeedColumn::CategoryId, &[12, 13]).unwrap();
    let request = FilterRequest::new(&input, FilterCriteria::new().with_any_query(clause));
    let schema = IngestSchema::default().with_coercion("CategoryId", ColumnCoercion::FloatOrZero);
    let result = FeedFilter::new(schema).filter(&request).await;

    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.records_matched, 2);
    assert_eq!(result.applied_filters, ["(CategoryId IN (12,13))"]);
}

#[tokio::test]
async fn test_repeated_runs_replace_stale_staging_store() {
    let temp_dir = TempDir::new().unwrap();
    let input = feed(temp_dir.path());
    let options = FilterOptions::default().with_keep_staging(true);
    let request =
        FilterRequest::new(&input, FilterCriteria::new().with_price_upper_limit(10.0)).with_options(options);

    let first = FeedFilter::default().filter(&request).await;
    let second = FeedFilter::default().filter(&request).await;

    assert_eq!(first.records_matched, 2);
    assert_eq!(second.records_read, 4);
    assert_eq!(second.records_matched, 2);
    let staging = second.staging_path.unwrap();
    assert_eq!(staging, temp_dir.path().join("feed_staging.db"));
    assert!(staging.exists());
}

#[tokio::test]
async fn test_failures_carry_stable_code_and_message() {
    let temp_dir = TempDir::new().unwrap();

    let missing = run(temp_dir.path(), FilterCriteria::new().with_gtins(["1"])).await;
    assert_eq!(missing.status, ResultCode::Failure);
    assert_eq!(missing.status.as_i32(), -1);
    assert!(!missing.message.is_empty());

    let input = feed(temp_dir.path());
    let unfiltered = run(&input, FilterCriteria::default()).await;
    assert_eq!(
        unfiltered.message,
        "No filters have been specified. Cannot filter. Aborting..."
    );
}
