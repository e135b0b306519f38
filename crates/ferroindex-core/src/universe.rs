//! Universe eligibility filter applied before ranking.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Candidate, ConfigError, Ticker};

type PredicateFn = dyn Fn(&Candidate) -> bool + Send + Sync;

/// Named, injectable eligibility predicate.
#[derive(Clone)]
pub struct CustomFilter {
    name: String,
    func: Arc<PredicateFn>,
}

impl CustomFilter {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Candidate) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepts(&self, candidate: &Candidate) -> bool {
        (self.func)(candidate)
    }
}

impl Debug for CustomFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Which securities may enter an index.
///
/// Empty lists and unset bounds do not filter. Country, sector and industry
/// names compare case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "UniverseRecord")]
pub struct Universe {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tickers: Vec<Ticker>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_countries: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sectors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_sectors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub industries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_average_daily_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_free_float: Option<f64>,
    #[serde(skip)]
    custom_filters: Vec<CustomFilter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UniverseRecord {
    tickers: Vec<Ticker>,
    countries: Vec<String>,
    exclude_countries: Vec<String>,
    sectors: Vec<String>,
    exclude_sectors: Vec<String>,
    industries: Vec<String>,
    min_market_cap: Option<f64>,
    max_market_cap: Option<f64>,
    min_average_daily_volume: Option<f64>,
    min_free_float: Option<f64>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static universe restricted to the given tickers.
    pub fn from_tickers<I, S>(tickers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tickers = tickers
            .into_iter()
            .map(|ticker| Ticker::parse(ticker.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tickers,
            ..Self::default()
        })
    }

    pub fn with_market_cap_range(
        mut self,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Self, ConfigError> {
        if let Some(min) = min {
            validate_non_negative("min_market_cap", min)?;
        }
        if let Some(max) = max {
            validate_non_negative("max_market_cap", max)?;
        }
        self.min_market_cap = min;
        self.max_market_cap = max;
        Ok(self)
    }

    pub fn with_min_average_daily_volume(mut self, value: f64) -> Result<Self, ConfigError> {
        validate_non_negative("min_average_daily_volume", value)?;
        self.min_average_daily_volume = Some(value);
        Ok(self)
    }

    pub fn with_min_free_float(mut self, value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::FreeFloatOutOfRange { value });
        }
        self.min_free_float = Some(value);
        Ok(self)
    }

    pub fn with_custom_filter(mut self, filter: CustomFilter) -> Self {
        self.custom_filters.push(filter);
        self
    }

    pub fn min_market_cap(&self) -> Option<f64> {
        self.min_market_cap
    }

    pub fn max_market_cap(&self) -> Option<f64> {
        self.max_market_cap
    }

    pub fn min_average_daily_volume(&self) -> Option<f64> {
        self.min_average_daily_volume
    }

    pub fn min_free_float(&self) -> Option<f64> {
        self.min_free_float
    }

    pub fn is_eligible(&self, candidate: &Candidate) -> bool {
        if !self.tickers.is_empty() && !self.tickers.contains(candidate.ticker()) {
            return false;
        }

        if !self.countries.is_empty() && !contains(&self.countries, &candidate.country) {
            return false;
        }
        if contains(&self.exclude_countries, &candidate.country) {
            return false;
        }
        if !self.sectors.is_empty() && !contains(&self.sectors, &candidate.sector) {
            return false;
        }
        if contains(&self.exclude_sectors, &candidate.sector) {
            return false;
        }
        if !self.industries.is_empty() && !contains(&self.industries, &candidate.industry) {
            return false;
        }

        if self
            .min_market_cap
            .is_some_and(|min| candidate.market_cap() < min)
        {
            return false;
        }
        if self
            .max_market_cap
            .is_some_and(|max| candidate.market_cap() > max)
        {
            return false;
        }
        if self
            .min_average_daily_volume
            .is_some_and(|min| candidate.average_daily_volume() < min)
        {
            return false;
        }
        if self
            .min_free_float
            .is_some_and(|min| candidate.free_float_factor() < min)
        {
            return false;
        }

        self.custom_filters
            .iter()
            .all(|filter| filter.accepts(candidate))
    }

    /// Eligible candidates, input order preserved.
    pub fn filter(&self, candidates: &[Candidate]) -> Vec<Candidate> {
        let eligible: Vec<Candidate> = candidates
            .iter()
            .filter(|candidate| self.is_eligible(candidate))
            .cloned()
            .collect();
        debug!(
            candidates = candidates.len(),
            eligible = eligible.len(),
            "universe filter applied"
        );
        eligible
    }
}

impl TryFrom<UniverseRecord> for Universe {
    type Error = ConfigError;

    fn try_from(record: UniverseRecord) -> Result<Self, Self::Error> {
        let mut universe = Self {
            tickers: record.tickers,
            countries: record.countries,
            exclude_countries: record.exclude_countries,
            sectors: record.sectors,
            exclude_sectors: record.exclude_sectors,
            industries: record.industries,
            ..Self::default()
        }
        .with_market_cap_range(record.min_market_cap, record.max_market_cap)?;

        if let Some(value) = record.min_average_daily_volume {
            universe = universe.with_min_average_daily_volume(value)?;
        }
        if let Some(value) = record.min_free_float {
            universe = universe.with_min_free_float(value)?;
        }
        Ok(universe)
    }
}

fn contains(values: &[String], needle: &str) -> bool {
    values
        .iter()
        .any(|value| value.trim().eq_ignore_ascii_case(needle.trim()))
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ConfigError::NegativeValue { field });
    }
    Ok(())
}
