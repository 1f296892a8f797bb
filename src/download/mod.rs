//! Ranged feed file retrieval.
//!
//! The feed API serves files in bounded byte ranges. This module requests
//! consecutive ranges and appends each body to a single local file until the
//! service reports the end of the resource.
//!
//! # Features
//!
//! - Range continuation driven by `Content-Range` confirmations
//! - Per-environment endpoints and chunk budgets (100 MiB production, 10 MiB sandbox)
//! - Streaming bodies straight to disk
//! - Retry with exponential backoff on connection-level failures
//! - Structured [`RetrievalResult`] instead of errors at the public boundary
//!
//! # Example
//!
//! ```no_run
//! use feed_sdk::download::{DownloadEngine, DownloadSettings};
//! use feed_sdk::feed::{FeedScope, RetrievalRequest};
//!
//! # async fn example() {
//! let engine = DownloadEngine::new(DownloadSettings::default());
//! let request = RetrievalRequest::new("220", "EBAY_US")
//!     .with_scope(FeedScope::Bootstrap)
//!     .with_token("v^1.1#i^1#...");
//! let result = engine.download(&request).await;
//! if let Some(path) = result.file_path {
//!     println!("feed at {}", path.display());
//! }
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod file;
pub mod range;
mod retry;

pub use client::FeedClient;
pub use engine::{DownloadEngine, DownloadSettings, RetrievalResult};
pub use error::DownloadError;
pub use file::FeedFile;
pub use range::{ContentRange, RangeWindow, next_range_header, next_window};
pub use retry::{
    DEFAULT_BACKOFF, DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
};
