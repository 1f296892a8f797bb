//! Error types for the filter module.

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DbError;

/// Errors raised while ingesting, querying or writing a filtered feed.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The input file or an option is unusable.
    #[error("{message}: {input}")]
    InputData {
        message: String,
        /// The offending path or value.
        input: String,
    },

    /// Every criterion was absent, so there is nothing to filter on.
    #[error("No filters have been specified. Cannot filter. Aborting...")]
    NoFilters,

    /// The delimited input could not be parsed.
    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Reading the input or writing the filtered output failed.
    #[error("IO error on file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging store or predicate execution failure.
    #[error(transparent)]
    Database(#[from] DbError),
}

impl FilterError {
    pub fn input_data(message: impl Into<String>, input: impl Into<String>) -> Self {
        Self::InputData {
            message: message.into(),
            input: input.into(),
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<sqlx::Error> for FilterError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::Query(err))
    }
}
