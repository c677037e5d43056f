//! Error types for evolution runs and input loading

use thiserror::Error;

/// Failure that aborts an evolution run. No partial result is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvolutionError {
    /// A contract, transaction, rate or cutoff date could not be parsed
    #[error("invalid date in {field}: {value:?}")]
    InvalidDate { field: String, value: String },

    /// A non-finite or disallowed negative value, or arithmetic overflow
    #[error("invalid numeric value in {field}: {value}")]
    InvalidNumeric { field: String, value: String },

    /// The date range is longer than the configured iteration budget
    #[error("date range spans {days} days, more than the budget of {max_days}")]
    IterationBudgetExceeded { days: i64, max_days: u32 },
}

impl EvolutionError {
    pub(crate) fn invalid_date(field: impl Into<String>, value: impl Into<String>) -> Self {
        EvolutionError::InvalidDate {
            field: field.into(),
            value: value.into(),
        }
    }

    pub(crate) fn invalid_numeric(field: impl Into<String>, value: impl ToString) -> Self {
        EvolutionError::InvalidNumeric {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Overflow while computing `field`
    pub(crate) fn overflow(field: &str) -> Self {
        Self::invalid_numeric(field, "overflow")
    }
}

/// Failure while reading contracts, transactions or rate series from disk
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },

    #[error(transparent)]
    Evolution(#[from] EvolutionError),
}
