//! Integration tests for ranged feed downloads against a mock feed API.

use std::io::Write;

use feed_sdk::download::RetryPolicy;
use feed_sdk::{
    DownloadEngine, DownloadSettings, Environment, FeedFilter, FeedScope, FeedType,
    FilterCriteria, FilterRequest, ResultCode, RetrievalRequest,
};
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn gzip_feed(lines: &[&str]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        writeln!(encoder, "{line}").unwrap();
    }
    encoder.finish().unwrap()
}

fn engine_for(server: &MockServer, chunk_size: u64) -> DownloadEngine {
    DownloadEngine::new(
        DownloadSettings::default()
            .with_base_url(Environment::Production, server.uri())
            .with_base_url(Environment::Sandbox, format!("{}/sandbox", server.uri()))
            .with_chunk_size(chunk_size)
            .with_retry_policy(RetryPolicy::no_retries()),
    )
}

/// Mounts `body` split into `chunk_size` pieces, each keyed by its Range header.
async fn mount_ranged(server: &MockServer, route: &str, body: &[u8], chunk_size: u64) {
    let total = body.len() as u64;
    let mut start = 0u64;
    while start < total {
        let end = (start + chunk_size).min(total) - 1;
        #[allow(clippy::cast_possible_truncation)]
        let slice = body[start as usize..=end as usize].to_vec();
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("Range", format!("bytes={start}-{}", start + chunk_size).as_str()))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", format!("bytes {start}-{end}/{total}").as_str())
                    .set_body_bytes(slice),
            )
            .expect(1)
            .mount(server)
            .await;
        start = end + 1;
    }
}

#[tokio::test]
async fn test_ranged_download_then_filter_pipeline() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let feed = gzip_feed(&[
        "ItemId\tSellerUsername\tPriceValue",
        "v1|1|0\talice\t5",
        "v1|2|0\tbob\t15",
        "v1|3|0\tcarol\t25",
    ]);
    let chunk_size = (feed.len() as u64).div_ceil(3);
    mount_ranged(&server, "/item", &feed, chunk_size).await;

    let temp_dir = TempDir::new().unwrap();
    let request = RetrievalRequest::new("1", "EBAY_US")
        .with_date("20190127")
        .with_download_location(temp_dir.path())
        .with_token("abc");

    let downloaded = engine_for(&server, chunk_size).download(&request).await;
    assert!(downloaded.is_success(), "{}", downloaded.message);
    let feed_path = downloaded.file_path.unwrap();
    assert_eq!(std::fs::read(&feed_path).unwrap(), feed);

    let filtered = FeedFilter::default()
        .filter(&FilterRequest::new(
            &feed_path,
            FilterCriteria::new().with_price_lower_limit(10.0),
        ))
        .await;
    assert!(filtered.is_success(), "{}", filtered.message);
    assert_eq!(filtered.records_read, 3);
    assert_eq!(filtered.records_matched, 2);
    assert!(filtered.file_path.unwrap().exists());
}

#[tokio::test]
async fn test_bootstrap_feed_sends_scope_without_date() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("feed_scope", "ALL_ACTIVE"))
        .and(query_param("category_id", "220"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"feed".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let request = RetrievalRequest::new("220", "EBAY_US")
        .with_scope(FeedScope::Bootstrap)
        .with_date("20190127")
        .with_download_location(temp_dir.path())
        .with_token("abc");

    let result = engine_for(&server, 1024).download(&request).await;

    assert!(result.is_success(), "{}", result.message);
    let received = server.received_requests().await.unwrap();
    assert!(!received[0].url.query().unwrap_or_default().contains("date="));
    assert!(
        result
            .file_path
            .unwrap()
            .ends_with("item_bootstrap_220_20190127_EBAY_US.gz")
    );
}

#[tokio::test]
async fn test_snapshot_feed_uses_sandbox_endpoint() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/sandbox/item_snapshot"))
        .and(query_param("snapshot_date", "2019-01-27T05:00:00Z"))
        .and(header("X-EBAY-C-MARKETPLACE-ID", "EBAY_DE"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"snapshot".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let request = RetrievalRequest::new("1", "EBAY_DE")
        .with_feed_type(FeedType::Snapshot)
        .with_environment(Environment::Sandbox)
        .with_date("2019-01-27T05:00:00Z")
        .with_download_location(temp_dir.path())
        .with_token("Bearer abc");

    let result = engine_for(&server, 1024).download(&request).await;

    assert_eq!(result.status, ResultCode::Success, "{}", result.message);
    assert_eq!(std::fs::read(result.file_path.unwrap()).unwrap(), b"snapshot");
}

#[tokio::test]
async fn test_forbidden_response_reports_service_errors() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "errors": [{"errorId": 1100, "message": "Access denied"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let request = RetrievalRequest::new("1", "EBAY_US")
        .with_date("20190127")
        .with_download_location(temp_dir.path())
        .with_token("abc");

    let result = engine_for(&server, 1024).download(&request).await;

    assert_eq!(result.status.as_i32(), -1);
    assert!(result.message.contains("Access denied"), "{}", result.message);
    assert_eq!(result.errors.unwrap()[0]["errorId"], 1100);
    assert!(result.file_path.unwrap().exists());
}

#[tokio::test]
async fn test_missing_download_location_is_created() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("a").join("b");
    let request = RetrievalRequest::new("1", "EBAY_US")
        .with_date("20190127")
        .with_download_location(&nested)
        .with_token("abc");

    let result = engine_for(&server, 1024).download(&request).await;

    assert!(result.is_success(), "{}", result.message);
    assert!(nested.is_dir());
}
