use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Factor, Ticker};

/// Plain, unvalidated candidate row as it arrives from a data snapshot.
///
/// Converted into a [`Candidate`] through `TryFrom`, which is also the path
/// serde takes when deserializing candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateRecord {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub country: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub market_cap: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_float_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_float_market_cap: Option<f64>,
    pub average_daily_volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pb_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    pub weight: f64,
}

/// A security eligible for, or member of, an index.
///
/// Two candidates are equal iff their tickers match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CandidateRecord", into = "CandidateRecord")]
pub struct Candidate {
    ticker: Ticker,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub country: String,
    pub currency: String,
    pub issuer: Option<String>,
    market_cap: f64,
    free_float_factor: f64,
    free_float_market_cap: Option<f64>,
    average_daily_volume: f64,
    dividend_yield: Option<f64>,
    pe_ratio: Option<f64>,
    pb_ratio: Option<f64>,
    revenue: Option<f64>,
    weight: f64,
}

impl Candidate {
    pub fn new(ticker: &str, market_cap: f64) -> Result<Self, ConfigError> {
        validate_non_negative("market_cap", market_cap)?;

        Ok(Self {
            ticker: Ticker::parse(ticker)?,
            name: String::new(),
            sector: String::new(),
            industry: String::new(),
            country: String::new(),
            currency: String::from("USD"),
            issuer: None,
            market_cap,
            free_float_factor: 1.0,
            free_float_market_cap: None,
            average_daily_volume: 0.0,
            dividend_yield: None,
            pe_ratio: None,
            pb_ratio: None,
            revenue: None,
            weight: 0.0,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = sector.into();
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = industry.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_free_float_factor(mut self, factor: f64) -> Result<Self, ConfigError> {
        if !factor.is_finite() || !(0.0..=1.0).contains(&factor) {
            return Err(ConfigError::FreeFloatOutOfRange { value: factor });
        }
        self.free_float_factor = factor;
        Ok(self)
    }

    /// Supply the free-float market cap directly instead of deriving it.
    pub fn with_free_float_market_cap(mut self, value: f64) -> Result<Self, ConfigError> {
        validate_non_negative("free_float_market_cap", value)?;
        self.free_float_market_cap = Some(value);
        Ok(self)
    }

    pub fn with_average_daily_volume(mut self, volume: f64) -> Result<Self, ConfigError> {
        validate_non_negative("average_daily_volume", volume)?;
        self.average_daily_volume = volume;
        Ok(self)
    }

    pub fn with_dividend_yield(mut self, value: f64) -> Result<Self, ConfigError> {
        validate_finite("dividend_yield", value)?;
        self.dividend_yield = Some(value);
        Ok(self)
    }

    pub fn with_pe_ratio(mut self, value: f64) -> Result<Self, ConfigError> {
        validate_finite("pe_ratio", value)?;
        self.pe_ratio = Some(value);
        Ok(self)
    }

    pub fn with_pb_ratio(mut self, value: f64) -> Result<Self, ConfigError> {
        validate_finite("pb_ratio", value)?;
        self.pb_ratio = Some(value);
        Ok(self)
    }

    pub fn with_revenue(mut self, value: f64) -> Result<Self, ConfigError> {
        validate_finite("revenue", value)?;
        self.revenue = Some(value);
        Ok(self)
    }

    pub fn with_weight(mut self, weight: f64) -> Result<Self, ConfigError> {
        validate_weight(weight)?;
        self.weight = weight;
        Ok(self)
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn market_cap(&self) -> f64 {
        self.market_cap
    }

    pub fn free_float_factor(&self) -> f64 {
        self.free_float_factor
    }

    /// Explicit free-float market cap, or `market_cap × free_float_factor`.
    pub fn free_float_market_cap(&self) -> f64 {
        self.free_float_market_cap
            .unwrap_or(self.market_cap * self.free_float_factor)
    }

    pub fn average_daily_volume(&self) -> f64 {
        self.average_daily_volume
    }

    pub fn dividend_yield(&self) -> Option<f64> {
        self.dividend_yield
    }

    pub fn pe_ratio(&self) -> Option<f64> {
        self.pe_ratio
    }

    pub fn pb_ratio(&self) -> Option<f64> {
        self.pb_ratio
    }

    pub fn revenue(&self) -> Option<f64> {
        self.revenue
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Issuer grouping key; a candidate without an issuer tag is its own issuer.
    pub fn issuer_key(&self) -> &str {
        self.issuer.as_deref().unwrap_or(self.ticker.as_str())
    }

    /// Resolve a factor to this candidate's value, `None` when it is not reported.
    pub fn factor_value(&self, factor: Factor) -> Option<f64> {
        match factor {
            Factor::MarketCap => Some(self.market_cap),
            Factor::FreeFloatMarketCap => Some(self.free_float_market_cap()),
            Factor::Liquidity | Factor::Volume => Some(self.average_daily_volume),
            Factor::DividendYield => self.dividend_yield,
            Factor::PriceToEarnings => self.pe_ratio,
            Factor::PriceToBook => self.pb_ratio,
            Factor::Revenue => self.revenue,
        }
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = weight.clamp(0.0, 1.0);
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.ticker == other.ticker
    }
}

impl Eq for Candidate {}

impl Hash for Candidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ticker.hash(state);
    }
}

impl TryFrom<CandidateRecord> for Candidate {
    type Error = ConfigError;

    fn try_from(record: CandidateRecord) -> Result<Self, Self::Error> {
        let mut candidate = Candidate::new(&record.ticker, record.market_cap)?
            .with_name(record.name)
            .with_sector(record.sector)
            .with_industry(record.industry)
            .with_country(record.country)
            .with_average_daily_volume(record.average_daily_volume)?
            .with_weight(record.weight)?;

        if !record.currency.trim().is_empty() {
            candidate.currency = record.currency.trim().to_ascii_uppercase();
        }
        candidate.issuer = record.issuer.filter(|issuer| !issuer.trim().is_empty());

        if let Some(factor) = record.free_float_factor {
            candidate = candidate.with_free_float_factor(factor)?;
        }
        if let Some(value) = record.free_float_market_cap {
            candidate = candidate.with_free_float_market_cap(value)?;
        }
        if let Some(value) = record.dividend_yield {
            candidate = candidate.with_dividend_yield(value)?;
        }
        if let Some(value) = record.pe_ratio {
            candidate = candidate.with_pe_ratio(value)?;
        }
        if let Some(value) = record.pb_ratio {
            candidate = candidate.with_pb_ratio(value)?;
        }
        if let Some(value) = record.revenue {
            candidate = candidate.with_revenue(value)?;
        }

        Ok(candidate)
    }
}

impl From<Candidate> for CandidateRecord {
    fn from(candidate: Candidate) -> Self {
        Self {
            ticker: candidate.ticker.into(),
            name: candidate.name,
            sector: candidate.sector,
            industry: candidate.industry,
            country: candidate.country,
            currency: candidate.currency,
            issuer: candidate.issuer,
            market_cap: candidate.market_cap,
            free_float_factor: Some(candidate.free_float_factor),
            free_float_market_cap: candidate.free_float_market_cap,
            average_daily_volume: candidate.average_daily_volume,
            dividend_yield: candidate.dividend_yield,
            pe_ratio: candidate.pe_ratio,
            pb_ratio: candidate.pb_ratio,
            revenue: candidate.revenue,
            weight: candidate.weight,
        }
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::NegativeValue { field });
    }
    Ok(())
}

fn validate_weight(value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::WeightOutOfRange { value });
    }
    Ok(())
}
