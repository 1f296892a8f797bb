//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use feed_sdk::credentials::TOKEN_ENV_VAR;
use feed_sdk::feed::{DEFAULT_MARKETPLACE, Environment, FeedScope, FeedType, FileFormat};
use feed_sdk::filter::{FilterCriteria, Predicate};

/// Download item feed files and filter them by row-level criteria.
///
/// Without `--filter-only` the feed is downloaded first and the result is
/// filtered; with it, the previously downloaded file is filtered in place.
#[derive(Parser, Debug)]
#[command(name = "feed-sdk")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Date the feed file was generated (yyyyMMdd, or yyyy-MM-ddTHH:mm:ssZ for snapshots)
    #[arg(short = 'd', long)]
    pub date: Option<String>,

    /// Level-one category id of the feed file
    #[arg(short = 'c', long, required_unless_present = "config")]
    pub category: Option<String>,

    /// Feed scope: ALL_ACTIVE or NEWLY_LISTED
    #[arg(long, default_value = "NEWLY_LISTED")]
    pub scope: FeedScope,

    /// Feed type: item or item_snapshot
    #[arg(long, default_value = "item")]
    pub feed_type: FeedType,

    /// Marketplace the feed is requested for
    #[arg(short = 'm', long, default_value = DEFAULT_MARKETPLACE)]
    pub marketplace: String,

    /// OAuth token for the consumer; the `Bearer` prefix is optional
    #[arg(long, env = TOKEN_ENV_VAR, hide_env_values = true)]
    pub token: Option<String>,

    /// API environment: PRODUCTION or SANDBOX
    #[arg(long = "env", default_value = "PRODUCTION")]
    pub environment: Environment,

    /// Directory feed files are downloaded to
    #[arg(short = 'l', long)]
    pub download_location: Option<PathBuf>,

    /// Filter the feed file already present in the download location instead of downloading it again
    #[arg(long)]
    pub filter_only: bool,

    /// Feed and filtered file format
    #[arg(long, default_value = "gzip")]
    pub format: FileFormat,

    /// Run the requests listed in a JSON config file instead
    #[arg(long, conflicts_with = "filter_only")]
    pub config: Option<PathBuf>,

    /// Leaf category ids to keep
    #[arg(long, num_args = 1.., value_name = "ID")]
    pub leaf_categories: Vec<String>,

    /// Seller user names to keep
    #[arg(long, num_args = 1.., value_name = "NAME")]
    pub sellers: Vec<String>,

    /// Item location countries to keep
    #[arg(long, num_args = 1.., value_name = "COUNTRY")]
    pub locations: Vec<String>,

    /// Lower limit of the item price
    #[arg(long)]
    pub price_lower: Option<f64>,

    /// Upper limit of the item price
    #[arg(long)]
    pub price_upper: Option<f64>,

    /// EPIDs to keep
    #[arg(long, num_args = 1.., value_name = "EPID")]
    pub epids: Vec<String>,

    /// Inferred EPIDs to keep
    #[arg(long, num_args = 1.., value_name = "EPID")]
    pub inferred_epids: Vec<String>,

    /// GTINs to keep
    #[arg(long, num_args = 1.., value_name = "GTIN")]
    pub gtins: Vec<String>,

    /// Item ids to keep
    #[arg(long, num_args = 1.., value_name = "ID")]
    pub item_ids: Vec<String>,

    /// Extra SQL boolean expression over feed columns (trusted input)
    #[arg(long, value_name = "EXPR")]
    pub query: Option<String>,

    /// Keep the SQLite staging database after filtering
    #[arg(long)]
    pub keep_staging: bool,

    /// Maximum retry attempts for connection failures (0-10)
    #[arg(short = 'r', long, default_value_t = feed_sdk::DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Seconds to wait for more response data before giving up (1-3600)
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,
}

impl Args {
    /// Filter criteria assembled from the filter flags.
    #[must_use]
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            item_ids: self.item_ids.clone(),
            leaf_category_ids: self.leaf_categories.clone(),
            seller_names: self.sellers.clone(),
            gtins: self.gtins.clone(),
            epids: self.epids.clone(),
            price_lower_limit: self.price_lower,
            price_upper_limit: self.price_upper,
            item_location_countries: self.locations.clone(),
            inferred_epids: self.inferred_epids.clone(),
            any_query: self.query.clone(),
        }
    }

    /// Whether the filter flags produce at least one clause. Zero price
    /// limits and empty lists count as absent.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        !Predicate::from_criteria(&self.criteria()).is_empty()
    }
}
