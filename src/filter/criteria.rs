//! Filter criteria accepted by [`FeedFilter`](super::FeedFilter).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Optional, independently specified row constraints.
///
/// Empty lists and absent values contribute no clause. Field names follow
/// the batch config keys (`itemIds`, `priceUpperLimit`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// `ItemId IN (...)`
    pub item_ids: Vec<String>,
    /// `CategoryId IN (...)`
    pub leaf_category_ids: Vec<String>,
    /// `SellerUsername IN (...)`
    pub seller_names: Vec<String>,
    /// `GTIN IN (...)`
    pub gtins: Vec<String>,
    /// `EPID IN (...)`
    pub epids: Vec<String>,
    /// `PriceValue >= ...`; zero means unset.
    pub price_lower_limit: Option<f64>,
    /// `PriceValue <= ...`; zero means unset.
    pub price_upper_limit: Option<f64>,
    /// `ItemLocationCountry IN (...)`
    pub item_location_countries: Vec<String>,
    /// `InferredEPID IN (...)`
    pub inferred_epids: Vec<String>,
    /// Raw SQL boolean expression over feed columns, ANDed with the rest.
    ///
    /// Inserted verbatim: only pass trusted input.
    pub any_query: Option<String>,
}

impl FilterCriteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_item_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.item_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_leaf_category_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leaf_category_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_seller_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seller_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_gtins<I, S>(mut self, gtins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gtins = gtins.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_epids<I, S>(mut self, epids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.epids = epids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_price_lower_limit(mut self, limit: f64) -> Self {
        self.price_lower_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_price_upper_limit(mut self, limit: f64) -> Self {
        self.price_upper_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_item_location_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.item_location_countries = countries.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_inferred_epids<I, S>(mut self, epids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inferred_epids = epids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_any_query(mut self, query: impl Into<String>) -> Self {
        self.any_query = Some(query.into());
        self
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[item_ids={:?}, leaf_category_ids={:?}, seller_names={:?}, gtins={:?}, epids={:?}, \
             price_lower_limit={:?}, price_upper_limit={:?}, item_location_countries={:?}, \
             inferred_epids={:?}, any_query={:?}]",
            self.item_ids,
            self.leaf_category_ids,
            self.seller_names,
            self.gtins,
            self.epids,
            self.price_lower_limit,
            self.price_upper_limit,
            self.item_location_countries,
            self.inferred_epids,
            self.any_query
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_config_keys() {
        let criteria: FilterCriteria = serde_json::from_str(
            r#"{"leafCategoryIds":["171485"],"priceUpperLimit":10,"anyQuery":"AvailabilityThreshold=10"}"#,
        )
        .unwrap();
        assert_eq!(criteria.leaf_category_ids, vec!["171485"]);
        assert_eq!(criteria.price_upper_limit, Some(10.0));
        assert_eq!(criteria.any_query.as_deref(), Some("AvailabilityThreshold=10"));
        assert!(criteria.item_ids.is_empty());
    }

    #[test]
    fn test_builder_collects_values() {
        let criteria = FilterCriteria::new()
            .with_seller_names(["alice", "bob"])
            .with_price_lower_limit(2.5);
        assert_eq!(criteria.seller_names, vec!["alice", "bob"]);
        assert_eq!(criteria.price_lower_limit, Some(2.5));
    }
}
