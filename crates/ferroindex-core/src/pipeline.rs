//! End-to-end composition: universe filter, rank, select, weight, validate.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    rank, select, validate, Candidate, IndexDefinition, Ticker, ValidationReport, WeightMap,
};

/// Result of composing one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composition {
    pub index: String,
    /// Weighted members in selection order.
    pub constituents: Vec<Candidate>,
    pub weights: WeightMap,
    pub report: ValidationReport,
    pub changes: RebalanceChanges,
}

impl Composition {
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }

    pub fn tickers(&self) -> Vec<&Ticker> {
        self.constituents.iter().map(Candidate::ticker).collect()
    }
}

/// Membership delta against the previous composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RebalanceChanges {
    pub additions: Vec<Ticker>,
    pub deletions: Vec<Ticker>,
    pub retained: Vec<Ticker>,
    /// Half the summed absolute weight change over old and new members.
    pub one_way_turnover: f64,
}

impl RebalanceChanges {
    /// Compare `current` weights against a previous membership.
    ///
    /// Previous weights come from each candidate's `weight`; a snapshot whose
    /// weights are all zero is treated as equal weighted.
    pub fn between(previous: &[Candidate], current: &WeightMap) -> Self {
        let before = previous_weights(previous);

        let additions = current
            .keys()
            .filter(|ticker| !before.contains_key(*ticker))
            .cloned()
            .collect();
        let deletions = before
            .keys()
            .filter(|ticker| !current.contains_key(*ticker))
            .cloned()
            .collect();
        let retained = current
            .keys()
            .filter(|ticker| before.contains_key(*ticker))
            .cloned()
            .collect();

        let union: BTreeSet<&Ticker> = before.keys().chain(current.keys()).collect();
        let one_way_turnover = union
            .into_iter()
            .map(|ticker| {
                let old = before.get(ticker).copied().unwrap_or(0.0);
                let new = current.get(ticker).copied().unwrap_or(0.0);
                (new - old).abs()
            })
            .sum::<f64>()
            / 2.0;

        Self {
            additions,
            deletions,
            retained,
            one_way_turnover,
        }
    }
}

fn previous_weights(previous: &[Candidate]) -> BTreeMap<Ticker, f64> {
    let total: f64 = previous.iter().map(Candidate::weight).sum();
    if total > 0.0 {
        return previous
            .iter()
            .map(|member| (member.ticker().clone(), member.weight() / total))
            .collect();
    }

    let unique: BTreeSet<&Ticker> = previous.iter().map(Candidate::ticker).collect();
    if unique.is_empty() {
        return BTreeMap::new();
    }
    let weight = 1.0 / unique.len() as f64;
    unique
        .into_iter()
        .map(|ticker| (ticker.clone(), weight))
        .collect()
}

/// Compose an index from a candidate snapshot.
///
/// Configuration errors are caught when `definition` is built, so this never
/// fails; problems with the outcome are reported in
/// [`Composition::report`].
pub fn compose(
    definition: &IndexDefinition,
    candidates: &[Candidate],
    previous: Option<&[Candidate]>,
) -> Composition {
    let started = Instant::now();

    let eligible = definition.universe().filter(candidates);
    let ranked = rank(&eligible, definition.ranking());
    let selected = select(&ranked, previous, definition.selection());
    let weights = definition.weighting().compute(&selected);

    let constituents: Vec<Candidate> = selected
        .into_iter()
        .filter_map(|mut member| {
            let weight = *weights.get(member.ticker())?;
            member.set_weight(weight);
            Some(member)
        })
        .collect();

    let report = validate(&constituents, definition.validation());
    let changes = previous
        .map(|previous| RebalanceChanges::between(previous, &weights))
        .unwrap_or_default();

    info!(
        index = definition.name(),
        candidates = candidates.len(),
        eligible = eligible.len(),
        constituents = constituents.len(),
        errors = report.error_count(),
        warnings = report.warning_count(),
        turnover = changes.one_way_turnover,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "index composed"
    );

    Composition {
        index: definition.name().to_owned(),
        constituents,
        weights,
        report,
        changes,
    }
}

/// One independent composition job.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub definition: IndexDefinition,
    pub candidates: Vec<Candidate>,
    pub previous: Option<Vec<Candidate>>,
}

impl CompositionRequest {
    pub fn new(definition: IndexDefinition, candidates: Vec<Candidate>) -> Self {
        Self {
            definition,
            candidates,
            previous: None,
        }
    }

    pub fn with_previous(mut self, previous: Vec<Candidate>) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn compose(&self) -> Composition {
        compose(&self.definition, &self.candidates, self.previous.as_deref())
    }
}

/// Compose independent requests in parallel. Output order matches input.
pub fn compose_many(requests: &[CompositionRequest]) -> Vec<Composition> {
    debug!(requests = requests.len(), "composing in parallel");
    requests.par_iter().map(CompositionRequest::compose).collect()
}
