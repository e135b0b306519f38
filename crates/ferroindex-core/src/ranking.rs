//! Ranking engine.
//!
//! Scores candidates with one [`ScoringStrategy`] and returns them in
//! descending score order. Equal scores keep their input order.

use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Candidate, ConfigError, Factor, StrategyError};

const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

type ScoreFn = dyn Fn(&Candidate) -> Result<f64, StrategyError> + Send + Sync;

/// Named, injectable scoring function.
#[derive(Clone)]
pub struct CustomScorer {
    name: String,
    func: Arc<ScoreFn>,
}

impl CustomScorer {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Candidate) -> Result<f64, StrategyError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the function; non-finite results are reported as failures.
    pub fn score(&self, candidate: &Candidate) -> Result<f64, StrategyError> {
        let value = (self.func)(candidate)?;
        if !value.is_finite() {
            return Err(StrategyError::new(format!(
                "scorer '{}' returned non-finite value {value}",
                self.name
            )));
        }
        Ok(value)
    }
}

impl Debug for CustomScorer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomScorer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Single ranking factor. `ascending` means lower values rank higher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorSpec {
    pub factor: Factor,
    #[serde(default)]
    pub ascending: bool,
}

impl FactorSpec {
    pub fn descending(factor: Factor) -> Self {
        Self {
            factor,
            ascending: false,
        }
    }

    pub fn ascending(factor: Factor) -> Self {
        Self {
            factor,
            ascending: true,
        }
    }

    fn signed(&self, value: f64) -> f64 {
        if self.ascending {
            -value
        } else {
            value
        }
    }
}

/// One factor of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightedFactorRecord")]
pub struct WeightedFactor {
    factor: Factor,
    weight: f64,
    ascending: bool,
}

#[derive(Deserialize)]
struct WeightedFactorRecord {
    factor: Factor,
    weight: f64,
    #[serde(default)]
    ascending: bool,
}

impl WeightedFactor {
    pub fn new(factor: Factor, weight: f64) -> Result<Self, ConfigError> {
        validate_factor_weight(weight)?;
        Ok(Self {
            factor,
            weight,
            ascending: false,
        })
    }

    pub fn ascending(mut self) -> Self {
        self.ascending = true;
        self
    }

    pub fn factor(&self) -> Factor {
        self.factor
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

impl TryFrom<WeightedFactorRecord> for WeightedFactor {
    type Error = ConfigError;

    fn try_from(record: WeightedFactorRecord) -> Result<Self, Self::Error> {
        let factor = Self::new(record.factor, record.weight)?;
        Ok(if record.ascending {
            factor.ascending()
        } else {
            factor
        })
    }
}

/// Custom factor blended into a composite score.
#[derive(Debug, Clone)]
pub struct WeightedCustomFactor {
    scorer: CustomScorer,
    weight: f64,
}

impl WeightedCustomFactor {
    pub fn new(scorer: CustomScorer, weight: f64) -> Result<Self, ConfigError> {
        validate_factor_weight(weight)?;
        Ok(Self { scorer, weight })
    }

    pub fn name(&self) -> &str {
        self.scorer.name()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Weighted blend of several factors.
///
/// The score of a candidate is the weighted average over the factors that
/// resolve for it, so candidates missing some data stay comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CompositeRecord", into = "CompositeRecord")]
pub struct CompositeScore {
    factors: Vec<WeightedFactor>,
    custom: Vec<WeightedCustomFactor>,
}

#[derive(Serialize, Deserialize)]
struct CompositeRecord {
    factors: Vec<WeightedFactor>,
}

impl CompositeScore {
    /// Build a composite. All weights together must sum to 1.0 (±0.001).
    pub fn new(
        factors: Vec<WeightedFactor>,
        custom: Vec<WeightedCustomFactor>,
    ) -> Result<Self, ConfigError> {
        if factors.is_empty() && custom.is_empty() {
            return Err(ConfigError::EmptyComposite);
        }

        let total: f64 = factors.iter().map(WeightedFactor::weight).sum::<f64>()
            + custom.iter().map(WeightedCustomFactor::weight).sum::<f64>();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::CompositeWeightSum { total });
        }

        Ok(Self { factors, custom })
    }

    pub fn factors(&self) -> &[WeightedFactor] {
        &self.factors
    }

    pub fn custom_factors(&self) -> &[WeightedCustomFactor] {
        &self.custom
    }

    pub fn score(&self, candidate: &Candidate) -> f64 {
        let mut total_score = 0.0;
        let mut total_weight = 0.0;

        for weighted in &self.factors {
            let Some(value) = candidate.factor_value(weighted.factor) else {
                continue;
            };
            let value = if weighted.ascending { -value } else { value };
            total_score += value * weighted.weight;
            total_weight += weighted.weight;
        }

        for custom in &self.custom {
            match custom.scorer.score(candidate) {
                Ok(value) => {
                    total_score += value * custom.weight;
                    total_weight += custom.weight;
                }
                Err(err) => {
                    warn!(
                        ticker = %candidate.ticker(),
                        factor = custom.name(),
                        error = %err,
                        "custom factor failed, skipping for candidate"
                    );
                }
            }
        }

        if total_weight > 0.0 {
            total_score / total_weight
        } else {
            0.0
        }
    }
}

impl TryFrom<CompositeRecord> for CompositeScore {
    type Error = ConfigError;

    fn try_from(record: CompositeRecord) -> Result<Self, Self::Error> {
        Self::new(record.factors, Vec::new())
    }
}

impl From<CompositeScore> for CompositeRecord {
    fn from(value: CompositeScore) -> Self {
        Self {
            factors: value.factors,
        }
    }
}

/// How candidates are ranked.
///
/// When several modes are configured the precedence is
/// custom > composite > single factor > market cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<FactorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeScore>,
    #[serde(skip)]
    pub custom: Option<CustomScorer>,
}

impl RankingConfig {
    pub fn market_cap() -> Self {
        Self::default()
    }

    pub fn by_factor(spec: FactorSpec) -> Self {
        Self {
            factor: Some(spec),
            ..Self::default()
        }
    }

    pub fn by_composite(composite: CompositeScore) -> Self {
        Self {
            composite: Some(composite),
            ..Self::default()
        }
    }

    pub fn with_custom(mut self, scorer: CustomScorer) -> Self {
        self.custom = Some(scorer);
        self
    }

    /// Resolve the configured modes to the one that applies.
    pub fn strategy(&self) -> ScoringStrategy<'_> {
        if let Some(custom) = &self.custom {
            return ScoringStrategy::Custom(custom);
        }
        if let Some(composite) = &self.composite {
            return ScoringStrategy::Composite(composite);
        }
        if let Some(spec) = self.factor {
            return ScoringStrategy::SingleFactor(spec);
        }
        ScoringStrategy::MarketCap
    }
}

/// Resolved scoring mode.
#[derive(Debug, Clone, Copy)]
pub enum ScoringStrategy<'a> {
    Custom(&'a CustomScorer),
    Composite(&'a CompositeScore),
    SingleFactor(FactorSpec),
    MarketCap,
}

impl ScoringStrategy<'_> {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Custom(_) => "custom",
            Self::Composite(_) => "composite",
            Self::SingleFactor(_) => "single_factor",
            Self::MarketCap => "market_cap",
        }
    }

    /// Score one candidate. Never fails: missing data scores 0.0 and a
    /// failing custom scorer zeroes only this candidate.
    pub fn score(&self, candidate: &Candidate) -> f64 {
        let raw = match self {
            Self::Custom(scorer) => match scorer.score(candidate) {
                Ok(value) => value,
                Err(err) => {
                    warn!(
                        ticker = %candidate.ticker(),
                        scorer = scorer.name(),
                        error = %err,
                        "custom scorer failed, scoring candidate as 0"
                    );
                    0.0
                }
            },
            Self::Composite(composite) => composite.score(candidate),
            Self::SingleFactor(spec) => {
                spec.signed(candidate.factor_value(spec.factor).unwrap_or(0.0))
            }
            Self::MarketCap => candidate.market_cap(),
        };

        // -0.0 from an ascending factor must tie with 0.0.
        if raw.is_finite() && raw != 0.0 {
            raw
        } else {
            0.0
        }
    }
}

/// Candidate paired with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

/// Rank candidates in strictly descending score order, stable on ties.
pub fn rank(candidates: &[Candidate], config: &RankingConfig) -> Vec<RankedCandidate> {
    let strategy = config.strategy();
    debug!(
        mode = strategy.as_str(),
        candidates = candidates.len(),
        "ranking candidates"
    );

    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .map(|candidate| RankedCandidate {
            candidate: candidate.clone(),
            score: strategy.score(candidate),
        })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .score
            .partial_cmp(&left.score)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

fn validate_factor_weight(weight: f64) -> Result<(), ConfigError> {
    if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
        return Err(ConfigError::FactorWeightOutOfRange { weight });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(ticker: &str, market_cap: f64) -> Candidate {
        Candidate::new(ticker, market_cap).expect("valid candidate")
    }

    fn tickers(ranked: &[RankedCandidate]) -> Vec<&str> {
        ranked
            .iter()
            .map(|item| item.candidate.ticker().as_str())
            .collect()
    }

    #[test]
    fn defaults_to_market_cap_descending() {
        let candidates = vec![candidate("B", 2.0), candidate("C", 3.0), candidate("A", 1.0)];
        let ranked = rank(&candidates, &RankingConfig::market_cap());
        assert_eq!(tickers(&ranked), vec!["C", "B", "A"]);
    }

    #[test]
    fn keeps_input_order_for_equal_scores() {
        let candidates = vec![candidate("X", 0.0), candidate("Y", 0.0), candidate("Z", 5.0)];
        let config = RankingConfig::by_factor(FactorSpec::descending(Factor::MarketCap));

        let first = rank(&candidates, &config);
        let second = rank(&candidates, &config);

        assert_eq!(tickers(&first), vec!["Z", "X", "Y"]);
        assert_eq!(tickers(&first), tickers(&second));
    }

    #[test]
    fn ascending_factor_ranks_lower_values_first() {
        let cheap = candidate("CHEAP", 1.0).with_pe_ratio(8.0).expect("valid");
        let dear = candidate("DEAR", 1.0).with_pe_ratio(40.0).expect("valid");
        let config = RankingConfig::by_factor(FactorSpec::ascending(Factor::PriceToEarnings));

        let ranked = rank(&[dear, cheap], &config);
        assert_eq!(tickers(&ranked), vec!["CHEAP", "DEAR"]);
        assert_eq!(ranked[0].score, -8.0);
    }

    #[test]
    fn missing_factor_value_scores_zero() {
        let with_yield = candidate("INC", 1.0).with_dividend_yield(0.03).expect("valid");
        let without = candidate("GRO", 1.0);
        let config = RankingConfig::by_factor(FactorSpec::descending(Factor::DividendYield));

        let ranked = rank(&[without, with_yield], &config);
        assert_eq!(tickers(&ranked), vec!["INC", "GRO"]);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn composite_rejects_weights_not_summing_to_one() {
        let factors = vec![
            WeightedFactor::new(Factor::MarketCap, 0.5).expect("valid"),
            WeightedFactor::new(Factor::DividendYield, 0.3).expect("valid"),
        ];
        let err = CompositeScore::new(factors, Vec::new()).expect_err("must fail");
        assert!(matches!(err, ConfigError::CompositeWeightSum { .. }));
    }

    #[test]
    fn composite_rejects_factor_weight_outside_unit_interval() {
        let err = WeightedFactor::new(Factor::MarketCap, 1.5).expect_err("must fail");
        assert!(matches!(err, ConfigError::FactorWeightOutOfRange { .. }));
    }

    #[test]
    fn composite_averages_over_resolved_factors() {
        let composite = CompositeScore::new(
            vec![
                WeightedFactor::new(Factor::DividendYield, 0.5).expect("valid"),
                WeightedFactor::new(Factor::PriceToBook, 0.5).expect("valid"),
            ],
            Vec::new(),
        )
        .expect("valid composite");

        let partial = candidate("P", 1.0).with_dividend_yield(4.0).expect("valid");
        let full = candidate("F", 1.0)
            .with_dividend_yield(4.0)
            .expect("valid")
            .with_pb_ratio(2.0)
            .expect("valid");
        let empty = candidate("E", 1.0);

        assert_eq!(composite.score(&partial), 4.0);
        assert_eq!(composite.score(&full), 3.0);
        assert_eq!(composite.score(&empty), 0.0);
    }

    #[test]
    fn composite_counts_custom_factor_weights_and_skips_failures() {
        let custom = WeightedCustomFactor::new(
            CustomScorer::new("quality", |candidate: &Candidate| {
                if candidate.ticker().as_str() == "BAD" {
                    Err(StrategyError::new("no data"))
                } else {
                    Ok(10.0)
                }
            }),
            0.5,
        )
        .expect("valid custom factor");
        let composite = CompositeScore::new(
            vec![WeightedFactor::new(Factor::MarketCap, 0.5).expect("valid")],
            vec![custom],
        )
        .expect("weights sum to one");

        assert_eq!(composite.score(&candidate("GOOD", 2.0)), 6.0);
        assert_eq!(composite.score(&candidate("BAD", 2.0)), 2.0);
    }

    #[test]
    fn custom_scorer_takes_precedence_and_isolates_failures() {
        let scorer = CustomScorer::new("inverse", |candidate: &Candidate| {
            if candidate.market_cap() == 0.0 {
                Err(StrategyError::new("division by zero"))
            } else {
                Ok(1.0 / candidate.market_cap())
            }
        });
        let config = RankingConfig::by_factor(FactorSpec::descending(Factor::MarketCap))
            .with_custom(scorer);

        let ranked = rank(
            &[candidate("BIG", 10.0), candidate("ZERO", 0.0), candidate("SMALL", 1.0)],
            &config,
        );

        assert_eq!(config.strategy().as_str(), "custom");
        assert_eq!(tickers(&ranked), vec!["SMALL", "BIG", "ZERO"]);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn deserializes_composite_through_validation() {
        let err = serde_json::from_str::<RankingConfig>(
            r#"{"composite":{"factors":[{"factor":"market_cap","weight":0.8}]}}"#,
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("sum to 1.0"));
    }
}
