//! Core engines for ferroindex.
//!
//! This crate contains:
//! - Candidate model, tickers and the factor catalog
//! - Ranking, selection, weighting and validation engines
//! - Universe filter and rebalancing schedule
//! - Index definitions loaded from JSON or YAML
//! - The composition pipeline and the response envelope
//!
//! | Stage | Entry point |
//! |-------|-------------|
//! | Eligibility | [`Universe::filter`] |
//! | Ranking | [`rank`] |
//! | Selection | [`select`] |
//! | Weighting | [`compute_weights`] |
//! | Validation | [`validate`] |
//! | All of the above | [`compose`], [`compose_many`] |

pub mod definition;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod pipeline;
pub mod ranking;
pub mod rebalancing;
pub mod selection;
pub mod universe;
pub mod validation;
pub mod weighting;

pub use definition::{load_candidates, IndexDefinition};
pub use domain::{format_date, parse_date, Candidate, CandidateRecord, Factor, Ticker, UtcDateTime};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};
pub use error::{ConfigError, CoreError, StrategyError};
pub use pipeline::{compose, compose_many, Composition, CompositionRequest, RebalanceChanges};
pub use ranking::{
    rank, CompositeScore, CustomScorer, FactorSpec, RankedCandidate, RankingConfig,
    ScoringStrategy, WeightedCustomFactor, WeightedFactor,
};
pub use rebalancing::{RebalancingFrequency, RebalancingSchedule};
pub use selection::{select, BufferRule, DiversificationConstraint, SelectionCriteria};
pub use universe::{CustomFilter, Universe};
pub use validation::{validate, Finding, Severity, ValidationReport, ValidationRules};
pub use weighting::{
    compute_weights, CustomWeighting, WeightCaps, WeightMap, WeightingMethod, WeightingScheme,
    MAX_CAP_ITERATIONS,
};
