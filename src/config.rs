//! JSON batch configuration: a list of download and/or filter requests.
//!
//! ```json
//! {
//!   "requests": [
//!     {
//!       "feedRequest": { "categoryId": "1", "marketplaceId": "EBAY_US", "date": "20190127" },
//!       "filterRequest": { "sellerNames": ["alice"], "priceUpperLimit": 10 }
//!     }
//!   ]
//! }
//! ```
//!
//! Requests run in file order. A failed download is logged and the request's
//! filter is skipped; a successful download becomes the filter's input.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::download::{DownloadEngine, RetrievalResult};
use crate::feed::{DEFAULT_MARKETPLACE, RetrievalRequest, UnknownValueError};
use crate::filter::{FeedFilter, FilterCriteria, FilterOptions, FilterRequest, FilterResult};

/// Errors raised while loading a batch configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file {} does not exist or is empty", path.display())]
    Missing { path: PathBuf },

    #[error("Could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No \"requests\" field exists in the config file {}", path.display())]
    NoRequests { path: PathBuf },

    #[error(transparent)]
    InvalidValue(#[from] UnknownValueError),
}

/// Top-level shape of a batch configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub requests: Option<Vec<ConfigRequest>>,
}

/// One entry of `requests`; either half may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRequest {
    #[serde(default)]
    pub feed_request: Option<FeedRequestConfig>,
    #[serde(default)]
    pub filter_request: Option<FilterRequestConfig>,
}

/// Download half of a request. Absent fields take the library defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedRequestConfig {
    pub marketplace_id: Option<String>,
    pub category_id: Option<String>,
    pub date: Option<String>,
    pub feed_scope: Option<String>,
    #[serde(rename = "type")]
    pub feed_type: Option<String>,
    pub environment: Option<String>,
    pub download_location: Option<PathBuf>,
    pub file_format: Option<String>,
}

impl FeedRequestConfig {
    /// Builds the retrieval request, attaching `token` when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown scope, feed type,
    /// environment or file format.
    pub fn to_retrieval_request(&self, token: Option<&str>) -> Result<RetrievalRequest, ConfigError> {
        let mut request = RetrievalRequest::new(
            self.category_id.clone().unwrap_or_default(),
            self.marketplace_id
                .as_deref()
                .unwrap_or(DEFAULT_MARKETPLACE),
        );
        if let Some(feed_type) = &self.feed_type {
            request = request.with_feed_type(feed_type.parse()?);
        }
        if let Some(scope) = &self.feed_scope {
            request = request.with_scope(scope.parse()?);
        }
        if let Some(date) = &self.date {
            request = request.with_date(date.as_str());
        }
        if let Some(environment) = &self.environment {
            request = request.with_environment(environment.parse()?);
        }
        if let Some(location) = &self.download_location {
            request = request.with_download_location(location);
        }
        if let Some(file_format) = &self.file_format {
            request = request.with_file_format(file_format.parse()?);
        }
        if let Some(token) = token {
            request = request.with_token(token);
        }
        Ok(request)
    }
}

/// Filter half of a request: criteria fields sit next to the input path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequestConfig {
    #[serde(default)]
    pub input_file_path: Option<PathBuf>,
    #[serde(default)]
    pub file_format: Option<String>,
    #[serde(flatten)]
    pub criteria: FilterCriteria,
}

impl FilterRequestConfig {
    /// Builds the filter request for `input_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown file format.
    pub fn to_filter_request(&self, input_path: &Path) -> Result<FilterRequest, ConfigError> {
        let mut options = FilterOptions::default();
        if let Some(file_format) = &self.file_format {
            options = options.with_file_format(file_format.parse()?);
        }
        Ok(FilterRequest::new(input_path, self.criteria.clone()).with_options(options))
    }
}

/// What happened to one configured request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOutcome {
    pub download: Option<RetrievalResult>,
    pub filter: Option<FilterResult>,
}

/// Reads and validates a batch configuration file.
///
/// # Errors
///
/// Fails when the file is missing or empty, cannot be read or parsed, or
/// has no `requests` field.
pub fn load_config(path: &Path) -> Result<BatchConfig, ConfigError> {
    let missing = || ConfigError::Missing {
        path: path.to_path_buf(),
    };
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => {}
        _ => return Err(missing()),
    }

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: BatchConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if config.requests.is_none() {
        return Err(ConfigError::NoRequests {
            path: path.to_path_buf(),
        });
    }
    Ok(config)
}

/// Runs every configured request in order.
///
/// Per-request problems are logged and recorded in the returned outcomes;
/// they never stop the batch.
#[instrument(skip_all, fields(requests = config.requests.as_ref().map_or(0, Vec::len)))]
pub async fn process_requests(
    config: &BatchConfig,
    engine: &DownloadEngine,
    filter: &FeedFilter,
    token: Option<&str>,
) -> Vec<RequestOutcome> {
    let requests = config.requests.as_deref().unwrap_or_default();
    if requests.is_empty() {
        error!("No requests to process");
        return Vec::new();
    }

    let mut outcomes = Vec::with_capacity(requests.len());
    for (index, entry) in requests.iter().enumerate() {
        outcomes.push(process_one(index, entry, engine, filter, token).await);
    }
    outcomes
}

async fn process_one(
    index: usize,
    entry: &ConfigRequest,
    engine: &DownloadEngine,
    filter: &FeedFilter,
    token: Option<&str>,
) -> RequestOutcome {
    let mut outcome = RequestOutcome::default();
    let mut downloaded: Option<PathBuf> = None;

    if let Some(feed_config) = &entry.feed_request {
        let request = match feed_config.to_retrieval_request(token) {
            Ok(request) => request,
            Err(e) => {
                error!(index, error = %e, "invalid feed request; continuing with the next request");
                return outcome;
            }
        };
        let result = engine.download(&request).await;
        if !result.is_success() {
            error!(
                index,
                file_path = ?result.file_path,
                message = %result.message,
                %request,
                "feed download failed; continuing with the next request"
            );
            outcome.download = Some(result);
            return outcome;
        }
        downloaded.clone_from(&result.file_path);
        outcome.download = Some(result);
    }

    if let Some(filter_config) = &entry.filter_request {
        let Some(input_path) = downloaded.or_else(|| filter_config.input_file_path.clone()) else {
            warn!(index, "filter request has no input file; skipping");
            return outcome;
        };
        let request = match filter_config.to_filter_request(&input_path) {
            Ok(request) => request,
            Err(e) => {
                error!(index, error = %e, "invalid filter request");
                return outcome;
            }
        };
        let result = filter.filter(&request).await;
        if result.is_success() {
            info!(index, matched = result.records_matched, file = ?result.file_path, "filter request complete");
        } else {
            error!(index, message = %result.message, "filter request failed");
        }
        outcome.filter = Some(result);
    }

    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::feed::{Environment, FeedScope, FeedType, FileFormat};
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_load_missing_and_empty_files() {
        let temp_dir = TempDir::new().unwrap();
        let absent = temp_dir.path().join("absent.json");
        assert!(matches!(load_config(&absent), Err(ConfigError::Missing { .. })));

        let empty = write_config(&temp_dir, "");
        let err = load_config(&empty).unwrap_err();
        assert!(err.to_string().ends_with("does not exist or is empty"));
    }

    #[test]
    fn test_load_rejects_invalid_json_and_missing_requests() {
        let temp_dir = TempDir::new().unwrap();
        let broken = write_config(&temp_dir, "{ not json");
        assert!(matches!(load_config(&broken), Err(ConfigError::Parse { .. })));

        let no_requests = write_config(&temp_dir, r#"{"other": []}"#);
        assert!(matches!(
            load_config(&no_requests),
            Err(ConfigError::NoRequests { .. })
        ));
    }

    #[test]
    fn test_feed_and_filter_fields_are_camel_case() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"{
                "requests": [{
                    "feedRequest": {
                        "marketplaceId": "EBAY_DE",
                        "categoryId": "625",
                        "date": "2019-01-27T05:00:00Z",
                        "feedScope": "ALL_ACTIVE",
                        "type": "item_snapshot",
                        "environment": "SANDBOX",
                        "downloadLocation": "/tmp/feeds",
                        "fileFormat": "gzip"
                    },
                    "filterRequest": {
                        "inputFilePath": "/tmp/feeds/in.gz",
                        "sellerNames": ["alice"],
                        "priceLowerLimit": 2.5,
                        "anyQuery": "ReturnsAccepted = 1"
                    }
                }]
            }"#,
        );

        let config = load_config(&path).unwrap();
        let requests = config.requests.unwrap();
        let entry = &requests[0];

        let request = entry
            .feed_request
            .as_ref()
            .unwrap()
            .to_retrieval_request(Some("tok"))
            .unwrap();
        assert_eq!(request.marketplace_id(), "EBAY_DE");
        assert_eq!(request.category_id(), "625");
        assert_eq!(request.feed_type(), FeedType::Snapshot);
        assert_eq!(request.scope(), FeedScope::Bootstrap);
        assert_eq!(request.environment(), Environment::Sandbox);
        assert_eq!(request.feed_date(), "2019-01-27T05:00:00Z");
        assert_eq!(request.file_format(), FileFormat::Gzip);
        assert_eq!(request.token(), Some("Bearer tok"));

        let filter = entry.filter_request.as_ref().unwrap();
        assert_eq!(filter.input_file_path.as_deref(), Some(Path::new("/tmp/feeds/in.gz")));
        assert_eq!(filter.criteria.seller_names, ["alice"]);
        assert_eq!(filter.criteria.price_lower_limit, Some(2.5));
        assert_eq!(filter.criteria.any_query.as_deref(), Some("ReturnsAccepted = 1"));
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let config = FeedRequestConfig {
            feed_scope: Some("WEEKLY".to_string()),
            ..FeedRequestConfig::default()
        };
        assert!(matches!(
            config.to_retrieval_request(None),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_download_skips_filter_and_continues() {
        let temp_dir = TempDir::new().unwrap();
        let config = BatchConfig {
            requests: Some(vec![
                ConfigRequest {
                    feed_request: Some(FeedRequestConfig {
                        category_id: Some("1".to_string()),
                        date: Some("20190127".to_string()),
                        download_location: Some(temp_dir.path().to_path_buf()),
                        ..FeedRequestConfig::default()
                    }),
                    filter_request: Some(FilterRequestConfig::default()),
                },
                ConfigRequest {
                    feed_request: None,
                    filter_request: Some(FilterRequestConfig {
                        input_file_path: Some(temp_dir.path().join("absent.gz")),
                        ..FilterRequestConfig::default()
                    }),
                },
            ]),
        };

        let outcomes = process_requests(
            &config,
            &DownloadEngine::default(),
            &FeedFilter::default(),
            None,
        )
        .await;

        assert_eq!(outcomes.len(), 2);
        let download = outcomes[0].download.as_ref().unwrap();
        assert_eq!(download.message, "No token has been provided");
        assert!(outcomes[0].filter.is_none());
        assert!(!outcomes[1].filter.as_ref().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_empty_request_list_processes_nothing() {
        let config = BatchConfig {
            requests: Some(Vec::new()),
        };
        let outcomes = process_requests(
            &config,
            &DownloadEngine::default(),
            &FeedFilter::default(),
            None,
        )
        .await;
        assert!(outcomes.is_empty());
    }
}
