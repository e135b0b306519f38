//! Index definitions and candidate snapshots on disk.
//!
//! Files ending in `.yaml` or `.yml` are read as YAML, everything else as
//! JSON. Every nested record goes through its validated constructor, so a
//! definition that loads is a definition that can run.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Candidate, ConfigError, CoreError, RankingConfig, RebalancingSchedule, SelectionCriteria,
    Universe, ValidationRules, WeightingMethod,
};

/// Everything needed to construct one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DefinitionRecord")]
pub struct IndexDefinition {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    universe: Universe,
    ranking: RankingConfig,
    selection: SelectionCriteria,
    weighting: WeightingMethod,
    validation: ValidationRules,
    rebalancing: RebalancingSchedule,
}

#[derive(Deserialize)]
struct DefinitionRecord {
    name: String,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    universe: Universe,
    #[serde(default)]
    ranking: RankingConfig,
    selection: SelectionCriteria,
    #[serde(default)]
    weighting: WeightingMethod,
    #[serde(default)]
    validation: ValidationRules,
    #[serde(default)]
    rebalancing: RebalancingSchedule,
}

impl IndexDefinition {
    /// Market-cap ranked and weighted, quarterly, no universe filter.
    pub fn new(name: impl Into<String>, selection: SelectionCriteria) -> Result<Self, ConfigError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ConfigError::EmptyIndexName);
        }

        Ok(Self {
            name,
            identifier: None,
            description: None,
            universe: Universe::default(),
            ranking: RankingConfig::default(),
            selection,
            weighting: WeightingMethod::default(),
            validation: ValidationRules::default(),
            rebalancing: RebalancingSchedule::default(),
        })
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_universe(mut self, universe: Universe) -> Self {
        self.universe = universe;
        self
    }

    pub fn with_ranking(mut self, ranking: RankingConfig) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_weighting(mut self, weighting: WeightingMethod) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_validation(mut self, validation: ValidationRules) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_rebalancing(mut self, rebalancing: RebalancingSchedule) -> Self {
        self.rebalancing = rebalancing;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn ranking(&self) -> &RankingConfig {
        &self.ranking
    }

    pub fn selection(&self) -> &SelectionCriteria {
        &self.selection
    }

    pub fn weighting(&self) -> &WeightingMethod {
        &self.weighting
    }

    pub fn validation(&self) -> &ValidationRules {
        &self.validation
    }

    pub fn rebalancing(&self) -> &RebalancingSchedule {
        &self.rebalancing
    }

    pub fn from_json_str(input: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, CoreError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let definition: Self = read_document(path.as_ref())?;
        debug!(index = definition.name(), "index definition loaded");
        Ok(definition)
    }
}

impl TryFrom<DefinitionRecord> for IndexDefinition {
    type Error = ConfigError;

    fn try_from(record: DefinitionRecord) -> Result<Self, Self::Error> {
        let mut definition = Self::new(record.name, record.selection)?
            .with_universe(record.universe)
            .with_ranking(record.ranking)
            .with_weighting(record.weighting)
            .with_validation(record.validation)
            .with_rebalancing(record.rebalancing);
        definition.identifier = record.identifier;
        definition.description = record.description;
        Ok(definition)
    }
}

/// Load a candidate snapshot: a JSON or YAML sequence of candidate records.
pub fn load_candidates(path: impl AsRef<Path>) -> Result<Vec<Candidate>, CoreError> {
    let path = path.as_ref();
    let candidates: Vec<Candidate> = read_document(path)?;
    debug!(
        path = %path.display(),
        candidates = candidates.len(),
        "candidate snapshot loaded"
    );
    Ok(candidates)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let raw = fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if is_yaml(path) {
        Ok(serde_yaml::from_str(&raw)?)
    } else {
        Ok(serde_json::from_str(&raw)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml")
        })
}
