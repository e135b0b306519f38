use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Candidate, ConfigError, Ticker};

use super::WeightMap;

/// Iteration ceiling for every redistribution loop.
pub const MAX_CAP_ITERATIONS: usize = 10;

/// Post-hoc constraints on a weight map.
///
/// Passes run in a fixed order: single constituent, sector, country, issuer,
/// then the minimum weight floor. Group passes are independent, so a later
/// pass may push an earlier group slightly back over its cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightCapsRecord", into = "WeightCapsRecord")]
pub struct WeightCaps {
    max_weight: Option<f64>,
    max_weight_per_sector: Option<f64>,
    max_weight_per_country: Option<f64>,
    max_weight_per_issuer: Option<f64>,
    min_weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct WeightCapsRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_weight_per_sector: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_weight_per_country: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_weight_per_issuer: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_weight: Option<f64>,
}

impl WeightCaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_weight(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_weight = Some(validate_bound("max_weight", value)?);
        Ok(self)
    }

    pub fn with_max_weight_per_sector(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_weight_per_sector = Some(validate_bound("max_weight_per_sector", value)?);
        Ok(self)
    }

    pub fn with_max_weight_per_country(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_weight_per_country = Some(validate_bound("max_weight_per_country", value)?);
        Ok(self)
    }

    pub fn with_max_weight_per_issuer(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_weight_per_issuer = Some(validate_bound("max_weight_per_issuer", value)?);
        Ok(self)
    }

    pub fn with_min_weight(mut self, value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || !(0.0..1.0).contains(&value) {
            return Err(ConfigError::MinWeightOutOfRange { value });
        }
        self.min_weight = Some(value);
        Ok(self)
    }

    pub fn max_weight(&self) -> Option<f64> {
        self.max_weight
    }

    pub fn max_weight_per_sector(&self) -> Option<f64> {
        self.max_weight_per_sector
    }

    pub fn max_weight_per_country(&self) -> Option<f64> {
        self.max_weight_per_country
    }

    pub fn max_weight_per_issuer(&self) -> Option<f64> {
        self.max_weight_per_issuer
    }

    pub fn min_weight(&self) -> Option<f64> {
        self.min_weight
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every configured pass to `weights` in place. Does not normalize.
    pub(crate) fn apply(&self, weights: &mut WeightMap, members: &[Candidate]) {
        if let Some(max_weight) = self.max_weight {
            apply_single_cap(weights, max_weight);
        }

        let passes: [(&str, Option<f64>, fn(&Candidate) -> &str); 3] = [
            ("sector", self.max_weight_per_sector, sector_of),
            ("country", self.max_weight_per_country, country_of),
            ("issuer", self.max_weight_per_issuer, Candidate::issuer_key),
        ];
        for (label, cap, group_of) in passes {
            if let Some(cap) = cap {
                let groups: HashMap<&Ticker, &str> = members
                    .iter()
                    .map(|member| (member.ticker(), group_of(member)))
                    .collect();
                apply_group_cap(weights, &groups, cap, label);
            }
        }

        if let Some(floor) = self.min_weight.filter(|floor| *floor > 0.0) {
            for weight in weights.values_mut() {
                if *weight < floor {
                    *weight = floor;
                }
            }
        }
    }
}

impl TryFrom<WeightCapsRecord> for WeightCaps {
    type Error = ConfigError;

    fn try_from(record: WeightCapsRecord) -> Result<Self, Self::Error> {
        let mut caps = Self::new();
        if let Some(value) = record.max_weight {
            caps = caps.with_max_weight(value)?;
        }
        if let Some(value) = record.max_weight_per_sector {
            caps = caps.with_max_weight_per_sector(value)?;
        }
        if let Some(value) = record.max_weight_per_country {
            caps = caps.with_max_weight_per_country(value)?;
        }
        if let Some(value) = record.max_weight_per_issuer {
            caps = caps.with_max_weight_per_issuer(value)?;
        }
        if let Some(value) = record.min_weight {
            caps = caps.with_min_weight(value)?;
        }
        Ok(caps)
    }
}

impl From<WeightCaps> for WeightCapsRecord {
    fn from(value: WeightCaps) -> Self {
        Self {
            max_weight: value.max_weight,
            max_weight_per_sector: value.max_weight_per_sector,
            max_weight_per_country: value.max_weight_per_country,
            max_weight_per_issuer: value.max_weight_per_issuer,
            min_weight: value.min_weight,
        }
    }
}

fn sector_of(candidate: &Candidate) -> &str {
    &candidate.sector
}

fn country_of(candidate: &Candidate) -> &str {
    &candidate.country
}

fn validate_bound(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::WeightBoundOutOfRange { field, value });
    }
    Ok(value)
}

/// Clip members above `max_weight` and hand the excess to the members at or
/// below it, proportionally to their current weight.
fn apply_single_cap(weights: &mut WeightMap, max_weight: f64) {
    for iteration in 0..MAX_CAP_ITERATIONS {
        let mut excess = 0.0;
        let mut uncapped_total = 0.0;
        let mut uncapped: Vec<Ticker> = Vec::new();

        for (ticker, weight) in weights.iter_mut() {
            if *weight > max_weight {
                excess += *weight - max_weight;
                *weight = max_weight;
            } else {
                uncapped_total += *weight;
                uncapped.push(ticker.clone());
            }
        }

        if excess == 0.0 {
            debug!(iteration, "single constituent cap settled");
            return;
        }
        if uncapped.is_empty() || uncapped_total <= 0.0 {
            warn!(excess, "no uncapped constituent left, dropping residual excess");
            return;
        }

        for ticker in &uncapped {
            if let Some(weight) = weights.get_mut(ticker) {
                *weight += excess * (*weight / uncapped_total);
            }
        }
    }
    debug!(
        iterations = MAX_CAP_ITERATIONS,
        "single constituent cap hit iteration ceiling"
    );
}

/// Scale overweight groups down to `cap` and hand the excess to groups that
/// were below it, proportionally to member weight.
fn apply_group_cap(
    weights: &mut WeightMap,
    groups: &HashMap<&Ticker, &str>,
    cap: f64,
    label: &str,
) {
    for iteration in 0..MAX_CAP_ITERATIONS {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for (ticker, weight) in weights.iter() {
            if let Some(group) = groups.get(ticker) {
                *totals.entry(*group).or_default() += *weight;
            }
        }

        let mut excess = 0.0;
        for (ticker, weight) in weights.iter_mut() {
            let Some(group) = groups.get(ticker) else {
                continue;
            };
            let total = totals.get(group).copied().unwrap_or(0.0);
            if total > cap {
                let scaled = *weight * (cap / total);
                excess += *weight - scaled;
                *weight = scaled;
            }
        }

        if excess == 0.0 {
            debug!(group = label, iteration, "group cap settled");
            return;
        }

        let underweight_total: f64 = totals.values().filter(|total| **total < cap).sum();
        if underweight_total <= 0.0 {
            warn!(group = label, excess, "no group below cap, dropping residual excess");
            return;
        }

        for (ticker, weight) in weights.iter_mut() {
            let Some(group) = groups.get(ticker) else {
                continue;
            };
            if totals.get(group).is_some_and(|total| *total < cap) {
                *weight += excess * (*weight / underweight_total);
            }
        }
    }
    debug!(
        group = label,
        iterations = MAX_CAP_ITERATIONS,
        "group cap hit iteration ceiling"
    );
}
