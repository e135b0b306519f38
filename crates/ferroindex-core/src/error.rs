use std::path::PathBuf;

use thiserror::Error;

/// Configuration and construction errors exposed by `ferroindex-core`.
///
/// Every variant is raised while a value is being built, never while an
/// engine is computing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("free float factor must be within [0, 1], got {value}")]
    FreeFloatOutOfRange { value: f64 },
    #[error("constituent weight must be within [0, 1], got {value}")]
    WeightOutOfRange { value: f64 },

    #[error("unknown factor '{value}'")]
    UnknownFactor { value: String },
    #[error("factor weight must be within [0, 1], got {weight}")]
    FactorWeightOutOfRange { weight: f64 },
    #[error("composite score needs at least one factor")]
    EmptyComposite,
    #[error("composite factor weights must sum to 1.0, got {total:.4}")]
    CompositeWeightSum { total: f64 },

    #[error("select count must be a positive integer")]
    InvalidSelectCount,
    #[error("buffer threshold '{field}' must be a positive rank")]
    InvalidBufferThreshold { field: &'static str },
    #[error("diversification limit '{field}' must be at least 1")]
    InvalidDiversificationLimit { field: &'static str },

    #[error("weight bound '{field}' must be within (0, 1], got {value}")]
    WeightBoundOutOfRange { field: &'static str, value: f64 },
    #[error("min_weight must be within [0, 1), got {value}")]
    MinWeightOutOfRange { value: f64 },
    #[error("factor weighting requires a factor")]
    MissingWeightingFactor,
    #[error("unknown weighting scheme '{value}'")]
    UnknownWeightingScheme { value: String },

    #[error("constituent bound '{field}' must be at least 1")]
    InvalidConstituentBound { field: &'static str },
    #[error("min_constituents {min} exceeds max_constituents {max}")]
    ConstituentBoundsInverted { min: usize, max: usize },

    #[error("month must be between 1 and 12, got {value}")]
    InvalidMonth { value: u8 },
    #[error("day must be between 1 and 31, got {value}")]
    InvalidDay { value: u8 },
    #[error("rebalancing schedule needs at least one month")]
    EmptyMonths,
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unknown rebalancing frequency '{value}'")]
    UnknownFrequency { value: String },

    #[error("index name cannot be empty")]
    EmptyIndexName,

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Failure reported by an injected scoring or weighting strategy.
///
/// Engines isolate these per item and never propagate them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StrategyError {
    message: String,
}

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
