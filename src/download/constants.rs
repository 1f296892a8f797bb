//! Constants for the download module (endpoints, chunk budgets, timeouts, headers).

/// Production feed API base URL.
pub const FEED_API_PROD_URL: &str = "https://api.ebay.com/buy/feed/v1_beta/";

/// Sandbox feed API base URL.
pub const FEED_API_SANDBOX_URL: &str = "https://api.sandbox.ebay.com/buy/feed/v1_beta/";

/// Maximum bytes requested per call against production (100 MiB).
pub const PROD_CHUNK_SIZE: u64 = 104_857_600;

/// Maximum bytes requested per call against the sandbox (10 MiB).
pub const SANDBOX_CHUNK_SIZE: u64 = 10_485_760;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle-read timeout: the longest wait for more response bytes (60 seconds).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Marketplace header understood by the feed service.
pub const MARKETPLACE_HEADER: &str = "X-EBAY-C-MARKETPLACE-ID";

/// Media type sent as both `Content-Type` and `Accept`.
pub const APPLICATION_JSON: &str = "application/json";

/// Prefix of every `Range` header value.
pub const RANGE_PREFIX: &str = "bytes=";
