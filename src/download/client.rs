//! HTTP transport for the feed API.
//!
//! [`FeedClient`] wraps a configured [`reqwest::Client`] bound to one API
//! base URL. It builds the per-feed URL and attaches the marketplace, bearer
//! and range headers. Any HTTP status is returned to the caller untouched;
//! retrying a window (request plus body) is the engine's job.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RANGE};
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use super::DownloadError;
use super::constants::{APPLICATION_JSON, MARKETPLACE_HEADER};
use super::range::RangeWindow;
use crate::feed::RetrievalRequest;
use crate::user_agent;

/// HTTP client for one feed API endpoint.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    base_url: Url,
}

impl FeedClient {
    /// Creates a client for `base_url` with explicit timeouts.
    ///
    /// `read_timeout` bounds each wait for more bytes, not the whole body, so
    /// a large window on a slow link completes as long as data keeps flowing.
    ///
    /// A missing trailing slash on `base_url` is added so that feed-type
    /// segments are appended rather than replacing the last path segment.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] if `base_url` does not parse, or
    /// [`DownloadError::Network`] if the TLS backend cannot be initialised.
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, DownloadError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&normalized).map_err(|_| DownloadError::invalid_url(base_url))?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|e| DownloadError::network(base_url.as_str(), e))?;

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full request URL for a retrieval: base, feed-type segment, query string.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] if the segment cannot be joined.
    pub fn feed_url(&self, request: &RetrievalRequest) -> Result<Url, DownloadError> {
        let mut url = self
            .base_url
            .join(request.feed_type().as_str())
            .map_err(|_| DownloadError::invalid_url(self.base_url.as_str()))?;
        url.query_pairs_mut()
            .extend_pairs(request.query_parameters());
        Ok(url)
    }

    /// Sends one ranged GET, without retry.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Timeout`] or [`DownloadError::Network`] when
    /// no response was received. HTTP error statuses are not errors here.
    pub async fn fetch_range(
        &self,
        url: &Url,
        marketplace_id: &str,
        authorization: &str,
        window: &RangeWindow,
    ) -> Result<Response, DownloadError> {
        debug!(range = %window, "sending range request");
        self.client
            .get(url.clone())
            .header(MARKETPLACE_HEADER, marketplace_id)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON)
            .header(RANGE, window.header_value())
            .send()
            .await
            .map_err(|e| map_transport_error(url.as_str(), e))
    }
}

/// Maps a reqwest failure to the transport error kinds.
pub(crate) fn map_transport_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}
