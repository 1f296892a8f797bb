//! Feed SDK Library
//!
//! Downloads item feed files from the feed API in byte ranges and filters
//! them by row-level criteria through a transient SQLite staging store.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`feed`] - Feed enumerations, the retrieval request and feed-date rules
//! - [`download`] - Ranged download engine with retrying transport
//! - [`filter`] - Predicate building, batch ingest and filtered export
//! - [`db`] - Transient SQLite staging store
//! - [`credentials`] - Bearer-token providers
//! - [`config`] - JSON batch-request driver
//! - [`result`] - Result codes shared by both engines

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod credentials;
pub mod db;
pub mod download;
pub mod feed;
pub mod filter;
pub mod result;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use config::{BatchConfig, ConfigError, load_config, process_requests};
pub use credentials::{EnvToken, StaticToken, TokenChain, TokenProvider};
pub use db::{DbError, StagingStore};
pub use download::{
    DEFAULT_MAX_RETRIES, DownloadEngine, DownloadError, DownloadSettings, RetrievalResult,
    RetryPolicy,
};
pub use feed::{Environment, FeedScope, FeedType, FileFormat, RetrievalRequest};
pub use filter::{FeedFilter, FilterCriteria, FilterError, FilterOptions, FilterRequest, FilterResult};
pub use result::ResultCode;
