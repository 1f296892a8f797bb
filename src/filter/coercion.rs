//! Per-column type coercion applied while staging feed rows.
//!
//! Feed files are untyped text. A handful of columns are known to hold
//! booleans or numbers; those are converted on ingest with an explicit
//! fallback value so one malformed cell never aborts a load. Everything else
//! stays text.

use std::collections::{HashMap, HashSet};

/// Fallback for quantity-like columns: the largest 64-bit signed integer.
#[allow(clippy::cast_precision_loss)]
pub const MAX_INT_FALLBACK: f64 = i64::MAX as f64;

const BOOL_COLUMNS: [&str; 2] = ["ImageAlteringProhibited", "ReturnsAccepted"];
const FLOAT_OR_MAX_COLUMNS: [&str; 2] = ["AvailabilityThreshold", "EstimatedAvailableQuantity"];
const FLOAT_OR_ZERO_COLUMNS: [&str; 2] = ["PriceValue", "ReturnPeriodValue"];

/// Columns whose free text routinely breaks delimited parsing.
const IGNORED_COLUMNS: [&str; 3] = ["AdditionalImageUrls", "ImageUrl", "Title"];

/// How one column is converted before staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCoercion {
    /// Permissive boolean; malformed input becomes `false`.
    Bool,
    /// Float; malformed input becomes [`MAX_INT_FALLBACK`].
    FloatOrMax,
    /// Float; malformed input becomes `0.0`.
    FloatOrZero,
    /// Opaque text; empty input becomes NULL.
    Text,
}

/// A coerced cell ready to bind into the staging store.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedValue {
    Bool(bool),
    Float(f64),
    Text(Option<String>),
}

/// Result of coercing one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: StagedValue,
    /// Set when the raw input was malformed and the fallback was used.
    pub fell_back: bool,
}

impl ColumnCoercion {
    /// SQLite column type used in the staging table.
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Bool => "BOOLEAN",
            Self::FloatOrMax | Self::FloatOrZero => "REAL",
            Self::Text => "TEXT",
        }
    }

    #[must_use]
    pub fn coerce(self, raw: &str) -> Coerced {
        match self {
            Self::Bool => {
                let parsed = parse_bool(raw);
                Coerced {
                    value: StagedValue::Bool(parsed.unwrap_or(false)),
                    fell_back: parsed.is_none(),
                }
            }
            Self::FloatOrMax => float_or(raw, MAX_INT_FALLBACK),
            Self::FloatOrZero => float_or(raw, 0.0),
            Self::Text => Coerced {
                value: StagedValue::Text((!raw.is_empty()).then(|| raw.to_string())),
                fell_back: false,
            },
        }
    }
}

fn float_or(raw: &str, fallback: f64) -> Coerced {
    let parsed = raw.trim().parse::<f64>().ok();
    Coerced {
        value: StagedValue::Float(parsed.unwrap_or(fallback)),
        fell_back: parsed.is_none(),
    }
}

/// Parses the usual truthy and falsy spellings, case-insensitively.
///
/// `y yes t true on 1` are true; `n no f false off 0` are false; anything
/// else is `None`.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Column-name to coercion mapping plus the set of columns never staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSchema {
    coercions: HashMap<String, ColumnCoercion>,
    ignored: HashSet<String>,
}

impl Default for IngestSchema {
    fn default() -> Self {
        let coercions = BOOL_COLUMNS
            .iter()
            .map(|name| (*name, ColumnCoercion::Bool))
            .chain(FLOAT_OR_MAX_COLUMNS.iter().map(|name| (*name, ColumnCoercion::FloatOrMax)))
            .chain(FLOAT_OR_ZERO_COLUMNS.iter().map(|name| (*name, ColumnCoercion::FloatOrZero)))
            .map(|(name, coercion)| (name.to_string(), coercion))
            .collect();
        let ignored = IGNORED_COLUMNS.iter().map(ToString::to_string).collect();
        Self { coercions, ignored }
    }
}

impl IngestSchema {
    /// A schema that stages every column as text.
    #[must_use]
    pub fn all_text() -> Self {
        Self {
            coercions: HashMap::new(),
            ignored: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_coercion(mut self, column: impl Into<String>, coercion: ColumnCoercion) -> Self {
        self.coercions.insert(column.into(), coercion);
        self
    }

    #[must_use]
    pub fn with_ignored(mut self, column: impl Into<String>) -> Self {
        self.ignored.insert(column.into());
        self
    }

    #[must_use]
    pub fn coercion_for(&self, column: &str) -> ColumnCoercion {
        self.coercions
            .get(column)
            .copied()
            .unwrap_or(ColumnCoercion::Text)
    }

    #[must_use]
    pub fn is_ignored(&self, column: &str) -> bool {
        self.ignored.contains(column)
    }
}
