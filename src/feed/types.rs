//! Closed enumerations for feed requests and feed files.
//!
//! Every branch point (endpoint selection, chunk sizing, query parameters,
//! file naming) matches on these exhaustively, so adding a variant is a
//! compile-time checked change.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A string did not name any variant of a feed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValueError {
    /// Which enumeration was being parsed (e.g. "feed scope").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownValueError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Kind of feed file served by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedType {
    /// Daily or bootstrap item feed, dated `yyyyMMdd`.
    #[default]
    Item,
    /// Hourly item snapshot feed, dated in ISO-8601 UTC.
    Snapshot,
}

impl FeedType {
    /// Path segment and file-name token for this feed type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Snapshot => "item_snapshot",
        }
    }
}

impl FromStr for FeedType {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "item" => Ok(Self::Item),
            "item_snapshot" | "snapshot" => Ok(Self::Snapshot),
            _ => Err(UnknownValueError::new("feed type", s)),
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a feed is an incremental daily delta or a full bootstrap snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedScope {
    /// Items newly listed on the requested day.
    #[default]
    Daily,
    /// Every active item.
    Bootstrap,
}

impl FeedScope {
    /// Value sent in the `feed_scope` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "NEWLY_LISTED",
            Self::Bootstrap => "ALL_ACTIVE",
        }
    }

    /// Token used in derived file names.
    #[must_use]
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Bootstrap => "bootstrap",
        }
    }
}

impl FromStr for FeedScope {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEWLY_LISTED" | "DAILY" => Ok(Self::Daily),
            "ALL_ACTIVE" | "BOOTSTRAP" => Ok(Self::Bootstrap),
            _ => Err(UnknownValueError::new("feed scope", s)),
        }
    }
}

impl fmt::Display for FeedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote service environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Sandbox => "sandbox",
        }
    }
}

impl FromStr for Environment {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "sandbox" => Ok(Self::Sandbox),
            _ => Err(UnknownValueError::new("environment", s)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression format of feed and filtered files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    Gzip,
    /// Uncompressed delimited text.
    Plain,
}

impl FileFormat {
    /// File extension including the leading dot, or empty for plain text.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gzip => ".gz",
            Self::Plain => "",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Plain => "plain",
        }
    }
}

impl FromStr for FileFormat {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "plain" | "none" => Ok(Self::Plain),
            _ => Err(UnknownValueError::new("file format", s)),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text encoding of feed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileEncoding {
    #[default]
    Utf8,
}

impl FileEncoding {
    /// Decodes raw field bytes, replacing invalid sequences.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl FromStr for FileEncoding {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            _ => Err(UnknownValueError::new("file encoding", s)),
        }
    }
}

/// Feed columns that filter criteria address by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedColumn {
    ItemId,
    CategoryId,
    SellerUsername,
    Gtin,
    Epid,
    PriceValue,
    ItemLocationCountry,
    InferredEpid,
}

impl FeedColumn {
    /// Header name of the column in feed files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ItemId => "ItemId",
            Self::CategoryId => "CategoryId",
            Self::SellerUsername => "SellerUsername",
            Self::Gtin => "GTIN",
            Self::Epid => "EPID",
            Self::PriceValue => "PriceValue",
            Self::ItemLocationCountry => "ItemLocationCountry",
            Self::InferredEpid => "InferredEPID",
        }
    }
}

impl fmt::Display for FeedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
