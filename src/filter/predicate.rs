//! Composition of filter criteria into a SQL `WHERE` predicate.
//!
//! Each present criterion becomes one clause; clauses are combined with
//! `AND` in a fixed order so the same criteria always produce the same
//! predicate text.

use std::fmt;

use super::FilterCriteria;
use crate::feed::FeedColumn;

const CLAUSE_SEPARATOR: &str = " AND ";

/// Ordered, non-empty clauses derived from a [`FilterCriteria`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<String>,
}

impl Predicate {
    /// Builds the clause list.
    ///
    /// Order: free-form expression, item ids, categories, sellers, GTINs,
    /// EPIDs, price lower bound, price upper bound, inferred EPIDs, item
    /// location countries.
    #[must_use]
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        let candidates = [
            expression_clause(criteria.any_query.as_deref()),
            strings_in_clause(FeedColumn::ItemId, &criteria.item_ids),
            strings_in_clause(FeedColumn::CategoryId, &criteria.leaf_category_ids),
            strings_in_clause(FeedColumn::SellerUsername, &criteria.seller_names),
            strings_in_clause(FeedColumn::Gtin, &criteria.gtins),
            strings_in_clause(FeedColumn::Epid, &criteria.epids),
            lower_bound_clause(FeedColumn::PriceValue, criteria.price_lower_limit),
            upper_bound_clause(FeedColumn::PriceValue, criteria.price_upper_limit),
            strings_in_clause(FeedColumn::InferredEpid, &criteria.inferred_epids),
            strings_in_clause(FeedColumn::ItemLocationCountry, &criteria.item_location_countries),
        ];
        Self {
            clauses: candidates.into_iter().flatten().collect(),
        }
    }

    #[must_use]
    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    #[must_use]
    pub fn into_clauses(self) -> Vec<String> {
        self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// All clauses joined with `AND`, or `None` when there are none.
    #[must_use]
    pub fn joined(&self) -> Option<String> {
        (!self.clauses.is_empty()).then(|| self.clauses.join(CLAUSE_SEPARATOR))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(CLAUSE_SEPARATOR))
    }
}

/// `<column> IN ('a','b')`. Embedded single quotes are doubled.
#[must_use]
pub fn strings_in_clause(column: FeedColumn, values: &[String]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let list = values
        .iter()
        .map(|value| format!("'{}'", value.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(",");
    Some(format!("{column} IN ({list})"))
}

/// `<column> IN (1,2)` with unquoted values.
///
/// None of the built-in criteria are numeric lists. This is for callers that
/// stage a column as a number through a custom [`IngestSchema`] and pass the
/// clause as the free-form query.
///
/// ```
/// use feed_sdk::feed::FeedColumn;
/// use feed_sdk::filter::predicate::numbers_in_clause;
///
/// let clause = numbers_in_clause(FeedColumn::CategoryId, &[11, 13]);
/// assert_eq!(clause.as_deref(), Some("CategoryId IN (11,13)"));
/// ```
///
/// [`IngestSchema`]: super::IngestSchema
#[must_use]
pub fn numbers_in_clause<T: fmt::Display>(column: FeedColumn, values: &[T]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let list = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    Some(format!("{column} IN ({list})"))
}

/// `<column> >= <limit>`; omitted for absent, zero or non-finite limits.
#[must_use]
pub fn lower_bound_clause(column: FeedColumn, limit: Option<f64>) -> Option<String> {
    significant(limit).map(|limit| format!("{column} >= {limit}"))
}

/// `<column> <= <limit>`; omitted for absent, zero or non-finite limits.
#[must_use]
pub fn upper_bound_clause(column: FeedColumn, limit: Option<f64>) -> Option<String> {
    significant(limit).map(|limit| format!("{column} <= {limit}"))
}

/// Wraps a caller-supplied expression in parentheses, unvalidated.
#[must_use]
pub fn expression_clause(expression: Option<&str>) -> Option<String> {
    expression
        .map(str::trim)
        .filter(|expression| !expression.is_empty())
        .map(|expression| format!("({expression})"))
}

fn significant(limit: Option<f64>) -> Option<f64> {
    limit.filter(|limit| limit.is_finite() && *limit != 0.0)
}
