//! Selection engine: ranked candidates plus previous membership in, new
//! membership out.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Candidate, ConfigError, RankedCandidate, Ticker};

/// Rank hysteresis band for incumbents.
///
/// A missing threshold falls back to the selection count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BufferRuleRecord", into = "BufferRuleRecord")]
pub struct BufferRule {
    add_threshold: Option<usize>,
    remove_threshold: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct BufferRuleRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    add_threshold: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remove_threshold: Option<usize>,
}

impl BufferRule {
    pub fn new(
        add_threshold: Option<usize>,
        remove_threshold: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if add_threshold == Some(0) {
            return Err(ConfigError::InvalidBufferThreshold {
                field: "add_threshold",
            });
        }
        if remove_threshold == Some(0) {
            return Err(ConfigError::InvalidBufferThreshold {
                field: "remove_threshold",
            });
        }

        Ok(Self {
            add_threshold,
            remove_threshold,
        })
    }

    pub fn add_threshold(&self) -> Option<usize> {
        self.add_threshold
    }

    pub fn remove_threshold(&self) -> Option<usize> {
        self.remove_threshold
    }
}

impl TryFrom<BufferRuleRecord> for BufferRule {
    type Error = ConfigError;

    fn try_from(record: BufferRuleRecord) -> Result<Self, Self::Error> {
        Self::new(record.add_threshold, record.remove_threshold)
    }
}

impl From<BufferRule> for BufferRuleRecord {
    fn from(value: BufferRule) -> Self {
        Self {
            add_threshold: value.add_threshold,
            remove_threshold: value.remove_threshold,
        }
    }
}

/// Per-group member count limits. `None` leaves a group unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DiversificationRecord", into = "DiversificationRecord")]
pub struct DiversificationConstraint {
    max_per_country: Option<usize>,
    max_per_sector: Option<usize>,
    max_per_issuer: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct DiversificationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_per_country: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_per_sector: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_per_issuer: Option<usize>,
}

impl DiversificationConstraint {
    pub fn new(
        max_per_country: Option<usize>,
        max_per_sector: Option<usize>,
        max_per_issuer: Option<usize>,
    ) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("max_per_country", max_per_country),
            ("max_per_sector", max_per_sector),
            ("max_per_issuer", max_per_issuer),
        ] {
            if value == Some(0) {
                return Err(ConfigError::InvalidDiversificationLimit { field });
            }
        }

        Ok(Self {
            max_per_country,
            max_per_sector,
            max_per_issuer,
        })
    }

    pub fn max_per_country(&self) -> Option<usize> {
        self.max_per_country
    }

    pub fn max_per_sector(&self) -> Option<usize> {
        self.max_per_sector
    }

    pub fn max_per_issuer(&self) -> Option<usize> {
        self.max_per_issuer
    }
}

impl TryFrom<DiversificationRecord> for DiversificationConstraint {
    type Error = ConfigError;

    fn try_from(record: DiversificationRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.max_per_country,
            record.max_per_sector,
            record.max_per_issuer,
        )
    }
}

impl From<DiversificationConstraint> for DiversificationRecord {
    fn from(value: DiversificationConstraint) -> Self {
        Self {
            max_per_country: value.max_per_country,
            max_per_sector: value.max_per_sector,
            max_per_issuer: value.max_per_issuer,
        }
    }
}

/// How many members to select and which rules shape the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SelectionRecord", into = "SelectionRecord")]
pub struct SelectionCriteria {
    select_count: usize,
    buffer: Option<BufferRule>,
    diversification: Option<DiversificationConstraint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SelectionRecord {
    select_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    buffer: Option<BufferRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diversification: Option<DiversificationConstraint>,
}

impl SelectionCriteria {
    pub fn new(select_count: usize) -> Result<Self, ConfigError> {
        if select_count == 0 {
            return Err(ConfigError::InvalidSelectCount);
        }
        Ok(Self {
            select_count,
            buffer: None,
            diversification: None,
        })
    }

    pub fn with_buffer(mut self, buffer: BufferRule) -> Self {
        self.buffer = Some(buffer);
        self
    }

    pub fn with_diversification(mut self, diversification: DiversificationConstraint) -> Self {
        self.diversification = Some(diversification);
        self
    }

    pub fn select_count(&self) -> usize {
        self.select_count
    }

    pub fn buffer(&self) -> Option<&BufferRule> {
        self.buffer.as_ref()
    }

    pub fn diversification(&self) -> Option<&DiversificationConstraint> {
        self.diversification.as_ref()
    }
}

impl TryFrom<SelectionRecord> for SelectionCriteria {
    type Error = ConfigError;

    fn try_from(record: SelectionRecord) -> Result<Self, Self::Error> {
        let mut criteria = Self::new(record.select_count)?;
        criteria.buffer = record.buffer;
        criteria.diversification = record.diversification;
        Ok(criteria)
    }
}

impl From<SelectionCriteria> for SelectionRecord {
    fn from(value: SelectionCriteria) -> Self {
        Self {
            select_count: value.select_count,
            buffer: value.buffer,
            diversification: value.diversification,
        }
    }
}

/// Select the new membership from a descending ranked list.
///
/// Returns at most `select_count` candidates with no duplicate tickers.
/// A ticker listed more than once keeps only its highest-ranked entry, and
/// buffer ranks count distinct tickers. Diversification backfills are
/// appended after the members that passed their quotas. Fewer eligible
/// candidates than `select_count` is not an error.
pub fn select(
    ranked: &[RankedCandidate],
    previous: Option<&[Candidate]>,
    criteria: &SelectionCriteria,
) -> Vec<Candidate> {
    let select_count = criteria.select_count;
    let ranked = distinct(ranked);

    let selected = match (criteria.buffer, previous) {
        (Some(buffer), Some(previous)) if !previous.is_empty() => {
            apply_buffer(&ranked, previous, &buffer, select_count)
        }
        _ => ranked
            .iter()
            .take(select_count)
            .map(|item| item.candidate.clone())
            .collect(),
    };

    match criteria.diversification {
        Some(constraint) => diversify(selected, &ranked, &constraint, select_count),
        None => selected,
    }
}

/// First occurrence of each ticker, in rank order.
fn distinct(ranked: &[RankedCandidate]) -> Vec<&RankedCandidate> {
    let mut seen: HashSet<&Ticker> = HashSet::with_capacity(ranked.len());
    let mut unique = Vec::with_capacity(ranked.len());
    for item in ranked {
        if seen.insert(item.candidate.ticker()) {
            unique.push(item);
        } else {
            debug!(ticker = %item.candidate.ticker(), "duplicate ticker skipped");
        }
    }
    unique
}

fn apply_buffer(
    ranked: &[&RankedCandidate],
    previous: &[Candidate],
    buffer: &BufferRule,
    select_count: usize,
) -> Vec<Candidate> {
    let incumbents: HashSet<&Ticker> = previous.iter().map(Candidate::ticker).collect();
    let add_threshold = buffer.add_threshold.unwrap_or(select_count);
    let remove_threshold = buffer.remove_threshold.unwrap_or(select_count);

    let mut selected: Vec<Candidate> = Vec::with_capacity(select_count);
    for (index, item) in ranked.iter().enumerate() {
        let rank = index + 1;
        let candidate = &item.candidate;

        if incumbents.contains(candidate.ticker()) {
            if rank <= remove_threshold {
                selected.push(candidate.clone());
            } else {
                debug!(
                    ticker = %candidate.ticker(),
                    rank,
                    remove_threshold,
                    "incumbent dropped by buffer"
                );
            }
        } else if rank <= add_threshold && selected.len() < select_count {
            selected.push(candidate.clone());
        }

        if selected.len() >= select_count {
            break;
        }
    }

    selected.truncate(select_count);
    selected
}

#[derive(Default)]
struct GroupCounts<'a> {
    country: HashMap<&'a str, usize>,
    sector: HashMap<&'a str, usize>,
    issuer: HashMap<&'a str, usize>,
}

impl<'a> GroupCounts<'a> {
    fn admits(&self, candidate: &Candidate, constraint: &DiversificationConstraint) -> bool {
        within(&self.country, candidate.country.as_str(), constraint.max_per_country)
            && within(&self.sector, candidate.sector.as_str(), constraint.max_per_sector)
            && within(&self.issuer, candidate.issuer_key(), constraint.max_per_issuer)
    }

    fn record(&mut self, candidate: &'a Candidate) {
        *self.country.entry(candidate.country.as_str()).or_default() += 1;
        *self.sector.entry(candidate.sector.as_str()).or_default() += 1;
        *self.issuer.entry(candidate.issuer_key()).or_default() += 1;
    }
}

fn within(counts: &HashMap<&str, usize>, group: &str, max: Option<usize>) -> bool {
    max.map_or(true, |max| counts.get(group).copied().unwrap_or(0) < max)
}

fn diversify(
    selected: Vec<Candidate>,
    ranked: &[&RankedCandidate],
    constraint: &DiversificationConstraint,
    select_count: usize,
) -> Vec<Candidate> {
    let mut admitted: Vec<&Candidate> = Vec::with_capacity(select_count);
    let mut counts = GroupCounts::default();

    for candidate in &selected {
        if counts.admits(candidate, constraint) {
            counts.record(candidate);
            admitted.push(candidate);
        } else {
            debug!(ticker = %candidate.ticker(), "rejected by diversification quota");
        }
    }

    let mut backfill: Vec<&Candidate> = Vec::new();
    if admitted.len() < select_count {
        let mut placed: HashSet<&Ticker> = admitted.iter().map(|c| c.ticker()).collect();
        for item in ranked {
            if admitted.len() + backfill.len() >= select_count {
                break;
            }
            let candidate = &item.candidate;
            if placed.contains(candidate.ticker()) || !counts.admits(candidate, constraint) {
                continue;
            }
            counts.record(candidate);
            placed.insert(candidate.ticker());
            backfill.push(candidate);
        }
        debug!(backfilled = backfill.len(), "diversification backfill complete");
    }

    admitted
        .into_iter()
        .chain(backfill)
        .cloned()
        .collect()
}
