//! Feed request model: enumerations, the retrieval descriptor and date rules.

mod date;
mod request;
mod types;

pub use date::{formatted_feed_date, validate_feed_date};
pub use request::{
    DEFAULT_MARKETPLACE, RetrievalRequest, TOKEN_BEARER_PREFIX, default_download_location,
    normalize_token,
};
pub use types::{
    Environment, FeedColumn, FeedScope, FeedType, FileEncoding, FileFormat, UnknownValueError,
};
