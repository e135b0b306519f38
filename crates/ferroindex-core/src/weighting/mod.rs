//! Weighting engine.
//!
//! Raw weights come from a [`WeightingScheme`]; [`WeightCaps`] are enforced
//! afterwards and the map is renormalized so weights sum to 1.0.

mod caps;

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Candidate, ConfigError, Factor, StrategyError, Ticker};

pub use caps::{WeightCaps, MAX_CAP_ITERATIONS};

/// Ticker to weight. Ordered by ticker.
pub type WeightMap = BTreeMap<Ticker, f64>;

type WeightFn = dyn Fn(&[Candidate]) -> Result<WeightMap, StrategyError> + Send + Sync;

/// Named, injectable raw weight derivation.
#[derive(Clone)]
pub struct CustomWeighting {
    name: String,
    func: Arc<WeightFn>,
}

impl CustomWeighting {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Candidate]) -> Result<WeightMap, StrategyError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Debug for CustomWeighting {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomWeighting")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Raw weight derivation.
#[derive(Debug, Clone)]
pub enum WeightingScheme {
    Equal,
    MarketCap,
    FreeFloatMarketCap,
    Factor(Factor),
    Custom(CustomWeighting),
}

impl WeightingScheme {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::MarketCap => "market_cap",
            Self::FreeFloatMarketCap => "free_float_market_cap",
            Self::Factor(_) => "factor",
            Self::Custom(_) => "custom",
        }
    }

    fn factor(&self) -> Option<Factor> {
        match self {
            Self::Factor(factor) => Some(*factor),
            _ => None,
        }
    }
}

impl Display for WeightingScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Factor(factor) => write!(f, "factor({factor})"),
            Self::Custom(custom) => write!(f, "custom({})", custom.name()),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Scheme names accepted in configuration. Factor and custom schemes need
/// more than a name and are built elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemeName {
    Equal,
    MarketCap,
    FreeFloatMarketCap,
    Factor,
}

impl FromStr for SchemeName {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "equal" | "equal_weight" => Ok(Self::Equal),
            "market_cap" => Ok(Self::MarketCap),
            "free_float_market_cap" | "free_float" => Ok(Self::FreeFloatMarketCap),
            "factor" | "factor_based" => Ok(Self::Factor),
            _ => Err(ConfigError::UnknownWeightingScheme {
                value: value.trim().to_owned(),
            }),
        }
    }
}

/// A weighting scheme plus optional caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "WeightingRecord", into = "WeightingRecord")]
pub struct WeightingMethod {
    scheme: WeightingScheme,
    caps: Option<WeightCaps>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WeightingRecord {
    scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    factor: Option<Factor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    caps: Option<WeightCaps>,
}

impl WeightingMethod {
    pub fn new(scheme: WeightingScheme) -> Self {
        Self { scheme, caps: None }
    }

    pub fn equal() -> Self {
        Self::new(WeightingScheme::Equal)
    }

    pub fn market_cap() -> Self {
        Self::new(WeightingScheme::MarketCap)
    }

    pub fn free_float_market_cap() -> Self {
        Self::new(WeightingScheme::FreeFloatMarketCap)
    }

    pub fn factor(factor: Factor) -> Self {
        Self::new(WeightingScheme::Factor(factor))
    }

    pub fn custom(weighting: CustomWeighting) -> Self {
        Self::new(WeightingScheme::Custom(weighting))
    }

    pub fn with_caps(mut self, caps: WeightCaps) -> Self {
        self.caps = (!caps.is_empty()).then_some(caps);
        self
    }

    pub fn scheme(&self) -> &WeightingScheme {
        &self.scheme
    }

    pub fn caps(&self) -> Option<&WeightCaps> {
        self.caps.as_ref()
    }

    pub fn compute(&self, members: &[Candidate]) -> WeightMap {
        compute_weights(members, &self.scheme, self.caps.as_ref())
    }
}

impl Default for WeightingMethod {
    fn default() -> Self {
        Self::market_cap()
    }
}

impl TryFrom<WeightingRecord> for WeightingMethod {
    type Error = ConfigError;

    fn try_from(record: WeightingRecord) -> Result<Self, Self::Error> {
        let scheme = match record.scheme.parse::<SchemeName>()? {
            SchemeName::Equal => WeightingScheme::Equal,
            SchemeName::MarketCap => WeightingScheme::MarketCap,
            SchemeName::FreeFloatMarketCap => WeightingScheme::FreeFloatMarketCap,
            SchemeName::Factor => {
                WeightingScheme::Factor(record.factor.ok_or(ConfigError::MissingWeightingFactor)?)
            }
        };

        let method = Self::new(scheme);
        Ok(match record.caps {
            Some(caps) => method.with_caps(caps),
            None => method,
        })
    }
}

impl From<WeightingMethod> for WeightingRecord {
    fn from(value: WeightingMethod) -> Self {
        Self {
            scheme: value.scheme.as_str().to_owned(),
            factor: value.scheme.factor(),
            caps: value.caps,
        }
    }
}

/// Derive weights for `members`, enforce `caps`, and normalize.
///
/// Returns an empty map for empty input; otherwise the weights sum to 1.0.
pub fn compute_weights(
    members: &[Candidate],
    scheme: &WeightingScheme,
    caps: Option<&WeightCaps>,
) -> WeightMap {
    if members.is_empty() {
        return WeightMap::new();
    }

    let mut weights = match scheme {
        WeightingScheme::Equal => equal_weights(members),
        WeightingScheme::MarketCap => proportional(members, Candidate::market_cap),
        WeightingScheme::FreeFloatMarketCap => proportional(members, |member| {
            let free_float = member.free_float_market_cap();
            if free_float > 0.0 {
                free_float
            } else {
                member.market_cap()
            }
        }),
        WeightingScheme::Factor(factor) => factor_weights(members, *factor),
        WeightingScheme::Custom(custom) => custom_weights(members, custom),
    };

    if let Some(caps) = caps {
        caps.apply(&mut weights, members);
    }

    normalize(&mut weights);
    debug!(
        scheme = scheme.as_str(),
        members = members.len(),
        weighted = weights.len(),
        "weights computed"
    );
    weights
}

fn equal_weights(members: &[Candidate]) -> WeightMap {
    let weight = 1.0 / members.len() as f64;
    members
        .iter()
        .map(|member| (member.ticker().clone(), weight))
        .collect()
}

fn proportional(members: &[Candidate], value_of: impl Fn(&Candidate) -> f64) -> WeightMap {
    let total: f64 = members.iter().map(&value_of).sum();
    if total <= 0.0 {
        return equal_weights(members);
    }
    members
        .iter()
        .map(|member| (member.ticker().clone(), value_of(member) / total))
        .collect()
}

/// Members without a positive factor value are left out of the map.
fn factor_weights(members: &[Candidate], factor: Factor) -> WeightMap {
    let usable: Vec<(&Candidate, f64)> = members
        .iter()
        .filter_map(|member| {
            member
                .factor_value(factor)
                .filter(|value| *value > 0.0)
                .map(|value| (member, value))
        })
        .collect();

    let total: f64 = usable.iter().map(|(_, value)| value).sum();
    if total <= 0.0 {
        debug!(%factor, "no member has a usable factor value, using equal weight");
        return equal_weights(members);
    }

    usable
        .into_iter()
        .map(|(member, value)| (member.ticker().clone(), value / total))
        .collect()
}

fn custom_weights(members: &[Candidate], custom: &CustomWeighting) -> WeightMap {
    let raw = match (custom.func)(members) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(
                weighting = custom.name(),
                error = %err,
                "custom weighting failed, using equal weight"
            );
            return equal_weights(members);
        }
    };

    let known: HashSet<&Ticker> = members.iter().map(Candidate::ticker).collect();
    let mut weights = WeightMap::new();
    for (ticker, weight) in raw {
        if !known.contains(&ticker) {
            warn!(weighting = custom.name(), %ticker, "dropping weight for non-member");
            continue;
        }
        if !weight.is_finite() || weight < 0.0 {
            warn!(weighting = custom.name(), %ticker, weight, "dropping invalid weight");
            continue;
        }
        weights.insert(ticker, weight);
    }

    if weights.values().sum::<f64>() <= 0.0 {
        warn!(
            weighting = custom.name(),
            "custom weighting produced no usable weight, using equal weight"
        );
        return equal_weights(members);
    }
    weights
}

fn normalize(weights: &mut WeightMap) {
    let total: f64 = weights.values().sum();
    if total <= 0.0 {
        return;
    }
    for weight in weights.values_mut() {
        *weight /= total;
    }
}
