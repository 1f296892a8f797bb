//! Immutable descriptor of one feed retrieval.

use std::fmt;
use std::path::{Path, PathBuf};

use super::date::formatted_feed_date;
use super::{Environment, FeedScope, FeedType, FileFormat};

/// Prefix the service expects in front of OAuth access tokens.
pub const TOKEN_BEARER_PREFIX: &str = "Bearer ";

/// Marketplace used when a request names none.
pub const DEFAULT_MARKETPLACE: &str = "EBAY_US";

/// Directory under the user's home where feeds land by default.
const DEFAULT_DOWNLOAD_SUBDIR: &str = "Desktop/feed-sdk";

/// Returns the default download directory (`~/Desktop/feed-sdk`).
///
/// Falls back to `./feed-sdk` when no home directory is known.
#[must_use]
pub fn default_download_location() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map_or_else(
            || PathBuf::from("feed-sdk"),
            |home| PathBuf::from(home).join(DEFAULT_DOWNLOAD_SUBDIR),
        )
}

/// Normalizes a raw token into an `Authorization` header value.
///
/// Empty tokens become `None`; tokens already carrying the bearer scheme are
/// kept as-is.
#[must_use]
pub fn normalize_token(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        None
    } else if token.starts_with("Bearer") {
        Some(token.to_string())
    } else {
        Some(format!("{TOKEN_BEARER_PREFIX}{token}"))
    }
}

/// Everything needed to download one feed file.
///
/// Constructed once per download and consumed by the download engine.
/// The bearer token is redacted from `Debug` and `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    feed_type: FeedType,
    scope: FeedScope,
    category_id: String,
    marketplace_id: String,
    feed_date: String,
    date_is_default: bool,
    environment: Environment,
    download_location: PathBuf,
    token: Option<String>,
    file_format: FileFormat,
}

impl RetrievalRequest {
    /// Creates a request with the default feed type, scope, environment,
    /// location, format and today's date.
    #[must_use]
    pub fn new(category_id: impl Into<String>, marketplace_id: impl Into<String>) -> Self {
        let feed_type = FeedType::default();
        Self {
            feed_type,
            scope: FeedScope::default(),
            category_id: category_id.into(),
            marketplace_id: marketplace_id.into(),
            feed_date: formatted_feed_date(feed_type, 0),
            date_is_default: true,
            environment: Environment::default(),
            download_location: default_download_location(),
            token: None,
            file_format: FileFormat::default(),
        }
    }

    /// Sets the feed type. A date that was never set explicitly is
    /// re-derived in the new type's format.
    #[must_use]
    pub fn with_feed_type(mut self, feed_type: FeedType) -> Self {
        if self.date_is_default {
            self.feed_date = formatted_feed_date(feed_type, 0);
        }
        self.feed_type = feed_type;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: FeedScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_date(mut self, feed_date: impl Into<String>) -> Self {
        self.feed_date = feed_date.into();
        self.date_is_default = false;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_download_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.download_location = location.into();
        self
    }

    /// Sets the bearer token, adding the `Bearer ` prefix when missing.
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = normalize_token(token);
        self
    }

    #[must_use]
    pub fn with_file_format(mut self, file_format: FileFormat) -> Self {
        self.file_format = file_format;
        self
    }

    #[must_use]
    pub fn feed_type(&self) -> FeedType {
        self.feed_type
    }

    #[must_use]
    pub fn scope(&self) -> FeedScope {
        self.scope
    }

    #[must_use]
    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    #[must_use]
    pub fn marketplace_id(&self) -> &str {
        &self.marketplace_id
    }

    #[must_use]
    pub fn feed_date(&self) -> &str {
        &self.feed_date
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn download_location(&self) -> &Path {
        &self.download_location
    }

    /// The normalized `Authorization` header value, if a token was given.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    /// Canonical name of the downloaded file:
    /// `<feedtype>_<daily|bootstrap>_<category>_<date>_<marketplace><ext>`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}{}",
            self.feed_type.as_str(),
            self.scope.file_prefix(),
            self.category_id,
            self.feed_date,
            self.marketplace_id,
            self.file_format.extension()
        )
    }

    /// Absolute destination path: download location joined with [`file_name`](Self::file_name).
    #[must_use]
    pub fn file_path(&self) -> PathBuf {
        self.download_location.join(self.file_name())
    }

    /// Query parameters sent with every request for this feed.
    #[must_use]
    pub fn query_parameters(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("category_id", self.category_id.as_str())];
        match self.feed_type {
            FeedType::Snapshot => params.push(("snapshot_date", self.feed_date.as_str())),
            FeedType::Item => {
                params.push(("feed_scope", self.scope.as_str()));
                match self.scope {
                    FeedScope::Daily => params.push(("date", self.feed_date.as_str())),
                    FeedScope::Bootstrap => {}
                }
            }
        }
        params
    }
}

impl fmt::Debug for RetrievalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalRequest")
            .field("feed_type", &self.feed_type)
            .field("scope", &self.scope)
            .field("category_id", &self.category_id)
            .field("marketplace_id", &self.marketplace_id)
            .field("feed_date", &self.feed_date)
            .field("environment", &self.environment)
            .field("download_location", &self.download_location)
            .field("file_format", &self.file_format)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for RetrievalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[feed_type={}, feed_scope={}, category_id={}, marketplace_id={}, feed_date={}, environment={}, download_location={}, file_format={}]",
            self.feed_type,
            self.scope,
            self.category_id,
            self.marketplace_id,
            self.feed_date,
            self.environment,
            self.download_location.display(),
            self.file_format
        )
    }
}
