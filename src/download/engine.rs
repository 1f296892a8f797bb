//! Download engine: drives ranged requests until a feed file is complete.
//!
//! One call to [`DownloadEngine::download`] runs the whole retrieval:
//!
//! ```text
//! INIT -> REQUESTING -> 200 FULL_CONTENT ----------------------> DONE
//!              ^     \-> 206 PARTIAL_CONTENT -> next window? --> DONE
//!              |__________________________________/ yes
//!         any other status / retries exhausted ----------------> FAILED
//! ```
//!
//! Requests are strictly sequential: the next range is only requested once
//! the previous body has been appended to the destination file. A window is
//! retried as a whole: when the connection drops or stalls while its body is
//! streaming, the bytes it already wrote are truncated away and the same
//! range is requested again under the configured [`RetryPolicy`].
//!
//! # Example
//!
//! ```no_run
//! use feed_sdk::download::{DownloadEngine, DownloadSettings};
//! use feed_sdk::feed::RetrievalRequest;
//!
//! # async fn example() {
//! let engine = DownloadEngine::new(DownloadSettings::default());
//! let request = RetrievalRequest::new("625", "EBAY_US")
//!     .with_date("20190127")
//!     .with_token("v^1.1#i^1#...");
//! let result = engine.download(&request).await;
//! println!("{}: {}", result.status, result.message);
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Response, StatusCode};
use tracing::{debug, error, info, instrument};
use url::Url;

use super::DownloadError;
use super::client::{FeedClient, map_transport_error};
use super::constants::{
    CONNECT_TIMEOUT_SECS, FEED_API_PROD_URL, FEED_API_SANDBOX_URL, PROD_CHUNK_SIZE,
    READ_TIMEOUT_SECS, SANDBOX_CHUNK_SIZE,
};
use super::file::FeedFile;
use super::range::{RangeWindow, next_window};
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::feed::{Environment, RetrievalRequest, validate_feed_date};
use crate::result::{ResultCode, SUCCESS_MESSAGE};

/// Endpoints, chunk budgets, timeouts and retry policy for downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Base URL used for [`Environment::Production`].
    pub production_url: String,
    /// Base URL used for [`Environment::Sandbox`].
    pub sandbox_url: String,
    /// Overrides the per-environment chunk budget when set.
    pub chunk_size: Option<u64>,
    pub connect_timeout: Duration,
    /// Longest wait for more bytes of a response; a body that keeps
    /// flowing is never cut off.
    pub read_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            production_url: FEED_API_PROD_URL.to_string(),
            sandbox_url: FEED_API_SANDBOX_URL.to_string(),
            chunk_size: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl DownloadSettings {
    /// Points one environment at a different base URL.
    #[must_use]
    pub fn with_base_url(mut self, environment: Environment, url: impl Into<String>) -> Self {
        match environment {
            Environment::Production => self.production_url = url.into(),
            Environment::Sandbox => self.sandbox_url = url.into(),
        }
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    #[must_use]
    pub fn base_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.production_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }

    /// Bytes requested per call in `environment`.
    #[must_use]
    pub fn chunk_size(&self, environment: Environment) -> u64 {
        self.chunk_size.unwrap_or(match environment {
            Environment::Production => PROD_CHUNK_SIZE,
            Environment::Sandbox => SANDBOX_CHUNK_SIZE,
        })
    }
}

/// Outcome of one retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub status: ResultCode,
    pub message: String,
    /// Destination file; set on failure too once the file was created.
    pub file_path: Option<PathBuf>,
    /// The service's `errors` payload for HTTP failures.
    pub errors: Option<serde_json::Value>,
}

impl RetrievalResult {
    #[must_use]
    pub fn success(file_path: PathBuf) -> Self {
        Self {
            status: ResultCode::Success,
            message: SUCCESS_MESSAGE.to_string(),
            file_path: Some(file_path),
            errors: None,
        }
    }

    #[must_use]
    pub fn failure(error: &DownloadError, file_path: Option<PathBuf>) -> Self {
        Self {
            status: ResultCode::Failure,
            message: error.result_message(),
            file_path,
            errors: error.errors().cloned(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Sequential ranged-download driver.
#[derive(Debug, Clone, Default)]
pub struct DownloadEngine {
    settings: DownloadSettings,
}

impl DownloadEngine {
    #[must_use]
    pub fn new(settings: DownloadSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Downloads the feed described by `request`.
    ///
    /// Never fails outright: every problem is reported through the returned
    /// [`RetrievalResult`]. Validation failures happen before any I/O and
    /// leave `file_path` unset; once the destination file exists its path is
    /// always reported.
    #[instrument(skip(self, request), fields(category = request.category_id(), feed_type = %request.feed_type()))]
    pub async fn download(&self, request: &RetrievalRequest) -> RetrievalResult {
        info!(%request, "starting feed download");

        let authorization = match validate_request(request).await {
            Ok(authorization) => authorization,
            Err(e) => {
                error!(error = %e, "feed request rejected");
                return RetrievalResult::failure(&e, None);
            }
        };

        let path = request.file_path();
        let mut file = match FeedFile::create(&path).await {
            Ok(file) => file,
            Err(e) => {
                error!(error = %e, "could not create destination file");
                return RetrievalResult::failure(&e, Some(path));
            }
        };

        let transferred = self.transfer(request, authorization, &mut file).await;
        let closed = file.close().await;

        match (transferred, closed) {
            (Ok(api_calls), Ok(bytes)) => {
                info!(path = %path.display(), bytes, api_calls, "feed download complete");
                RetrievalResult::success(path)
            }
            (Err(e), _) | (Ok(_), Err(e)) => {
                error!(path = %path.display(), error = %e, "feed download failed");
                RetrievalResult::failure(&e, Some(path))
            }
        }
    }

    /// Runs the request/append/advance loop, returning the number of API calls.
    async fn transfer(
        &self,
        request: &RetrievalRequest,
        authorization: &str,
        file: &mut FeedFile,
    ) -> Result<u32, DownloadError> {
        let environment = request.environment();
        let client = FeedClient::new(
            self.settings.base_url(environment),
            self.settings.connect_timeout,
            self.settings.read_timeout,
        )?;
        let url = client.feed_url(request)?;
        let chunk_size = self.settings.chunk_size(environment);
        info!(%url, chunk_size, %environment, "resolved feed endpoint");

        let mut window = RangeWindow::first(chunk_size);
        let mut api_calls = 0u32;

        loop {
            api_calls += 1;
            info!(api_calls, range = %window, "calling feed API");

            match self
                .fetch_window_with_retry(&client, &url, request, authorization, &window, file)
                .await?
            {
                WindowOutcome::Complete => {
                    debug!("full content received");
                    return Ok(api_calls);
                }
                WindowOutcome::Partial(confirmation) => {
                    debug!(content_range = %confirmation, written = file.bytes_written(), "partial content received");
                    match next_window(Some(&confirmation), chunk_size)? {
                        Some(next) => window = next,
                        None => return Ok(api_calls),
                    }
                }
            }
        }
    }

    /// Fetches one window, repeating the request and body on transport
    /// failures. Bytes written by a failed attempt are truncated first.
    #[instrument(skip_all, fields(range = %window))]
    async fn fetch_window_with_retry(
        &self,
        client: &FeedClient,
        url: &Url,
        request: &RetrievalRequest,
        authorization: &str,
        window: &RangeWindow,
        file: &mut FeedFile,
    ) -> Result<WindowOutcome, DownloadError> {
        let policy = &self.settings.retry_policy;
        let offset = file.bytes_written();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let error = match fetch_window(
                client,
                url,
                request.marketplace_id(),
                authorization,
                window,
                file,
            )
            .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(e) => e,
            };

            match policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        attempt = next_attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        discarded = file.bytes_written().saturating_sub(offset),
                        error = %error,
                        "retrying feed window"
                    );
                    file.truncate_to(offset).await?;
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(%reason, attempt, "not retrying feed window");
                    return Err(error);
                }
            }
        }
    }
}

/// What a successfully transferred window means for the loop.
enum WindowOutcome {
    /// 200: the whole resource arrived.
    Complete,
    /// 206, carrying the `Content-Range` confirmation.
    Partial(String),
}

/// One attempt at a window: the request and its whole body.
async fn fetch_window(
    client: &FeedClient,
    url: &Url,
    marketplace_id: &str,
    authorization: &str,
    window: &RangeWindow,
    file: &mut FeedFile,
) -> Result<WindowOutcome, DownloadError> {
    let response = client
        .fetch_range(url, marketplace_id, authorization, window)
        .await?;

    match response.status() {
        StatusCode::OK => {
            append_body(response, url, file).await?;
            Ok(WindowOutcome::Complete)
        }
        StatusCode::PARTIAL_CONTENT => {
            let confirmation = content_range(&response)?;
            append_body(response, url, file).await?;
            Ok(WindowOutcome::Partial(confirmation))
        }
        status => {
            let body = response
                .bytes()
                .await
                .map_err(|e| map_transport_error(url.as_str(), e))?;
            Err(DownloadError::service(status.as_u16(), &body))
        }
    }
}

/// Pre-flight checks run before any file or network I/O.
///
/// Returns the `Authorization` header value on success.
async fn validate_request(request: &RetrievalRequest) -> Result<&str, DownloadError> {
    let authorization = request
        .token()
        .ok_or_else(|| DownloadError::authorization("No token has been provided"))?;

    let location = request.download_location();
    if let Ok(metadata) = tokio::fs::metadata(location).await
        && !metadata.is_dir()
    {
        return Err(DownloadError::input_data(
            "Download location is not a directory",
            location.display().to_string(),
        ));
    }

    validate_feed_date(request.feed_date(), request.feed_type())?;
    Ok(authorization)
}

fn content_range(response: &Response) -> Result<String, DownloadError> {
    let value = response
        .headers()
        .get(CONTENT_RANGE)
        .ok_or_else(|| DownloadError::input_data("Missing content-range header", ""))?;
    value
        .to_str()
        .map(str::to_string)
        .map_err(|_| DownloadError::input_data("Bad content-range header format", format!("{value:?}")))
}

async fn append_body(
    response: Response,
    url: &Url,
    file: &mut FeedFile,
) -> Result<(), DownloadError> {
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| map_transport_error(url.as_str(), e))?;
        file.append(&chunk).await?;
    }
    Ok(())
}
