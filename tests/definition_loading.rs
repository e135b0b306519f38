//! Behavior-driven tests for loading index definitions and snapshots
//!
//! Definitions and candidate snapshots arrive as JSON or YAML files. Invalid
//! configuration must be rejected when the file is loaded, before any
//! composition runs.

use std::fs;
use std::path::PathBuf;

use ferroindex_core::{
    compose, load_candidates, ConfigError, CoreError, Factor, IndexDefinition,
    RebalancingFrequency, WeightingScheme,
};
use ferroindex_tests::tickers;
use tempfile::{tempdir, TempDir};

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

const DIVIDEND_INDEX: &str = r#"
name: Global Dividend 3
identifier: GDIV3
universe:
  exclude_sectors: [Financials]
  min_market_cap: 1000000000
ranking:
  composite:
    factors:
      - factor: dividend_yield
        weight: 0.7
      - factor: market_cap
        weight: 0.3
selection:
  select_count: 3
  diversification:
    max_per_country: 2
weighting:
  scheme: equal
validation:
  min_constituents: 3
rebalancing:
  frequency: semi-annual
  day: 20
"#;

const SNAPSHOT: &str = r#"[
  {"ticker":"AAA","country":"US","sector":"Utilities","market_cap":5e10,"dividend_yield":0.05},
  {"ticker":"BBB","country":"US","sector":"Energy","market_cap":8e10,"dividend_yield":0.06},
  {"ticker":"CCC","country":"US","sector":"Staples","market_cap":6e10,"dividend_yield":0.045},
  {"ticker":"DDD","country":"UK","sector":"Energy","market_cap":4e10,"dividend_yield":0.03},
  {"ticker":"BANK","country":"US","sector":"Financials","market_cap":9e10,"dividend_yield":0.08},
  {"ticker":"TINY","country":"DE","sector":"Utilities","market_cap":1e8,"dividend_yield":0.09}
]"#;

// =============================================================================
// Definitions: Loading
// =============================================================================

#[test]
fn when_user_loads_a_yaml_definition_every_section_is_applied() {
    // Given: A YAML definition on disk
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "dividend.yaml", DIVIDEND_INDEX);

    // When: Loading it
    let definition = IndexDefinition::load(&path).expect("definition loads");

    // Then: Each nested record carries its configured values
    assert_eq!(definition.name(), "Global Dividend 3");
    assert_eq!(definition.identifier(), Some("GDIV3"));
    assert_eq!(definition.selection().select_count(), 3);
    assert!(matches!(definition.weighting().scheme(), WeightingScheme::Equal));
    let composite = definition
        .ranking()
        .composite
        .as_ref()
        .expect("composite ranking");
    assert_eq!(composite.factors()[0].factor(), Factor::DividendYield);
    assert_eq!(
        definition.rebalancing().frequency(),
        RebalancingFrequency::SemiAnnual
    );
    assert_eq!(definition.rebalancing().months(), &[6, 12]);
    assert_eq!(definition.rebalancing().day(), 20);
}

#[test]
fn when_user_loads_the_same_definition_as_json_the_result_matches() {
    // Given: The JSON form of a small definition
    let dir = tempdir().expect("tempdir");
    let path = write(
        &dir,
        "top.json",
        r#"{"name":"Top 2","selection":{"select_count":2},
            "weighting":{"scheme":"market-cap","caps":{"max_weight":0.6}}}"#,
    );

    // When: Loading it
    let definition = IndexDefinition::load(&path).expect("definition loads");

    // Then: Defaults fill everything left out
    assert!(matches!(
        definition.weighting().scheme(),
        WeightingScheme::MarketCap
    ));
    assert_eq!(
        definition.weighting().caps().and_then(|caps| caps.max_weight()),
        Some(0.6)
    );
    assert_eq!(
        definition.rebalancing().frequency(),
        RebalancingFrequency::Quarterly
    );
}

// =============================================================================
// Definitions: Rejection
// =============================================================================

#[test]
fn when_composite_weights_are_off_the_definition_is_rejected_at_load() {
    // Given: Composite weights summing to 0.8
    let dir = tempdir().expect("tempdir");
    let path = write(
        &dir,
        "bad.yaml",
        r#"
name: Broken
ranking:
  composite:
    factors:
      - factor: market_cap
        weight: 0.5
      - factor: revenue
        weight: 0.3
selection:
  select_count: 10
"#,
    );

    // When: Loading it
    let err = IndexDefinition::load(&path).expect_err("must fail");

    // Then: The parse error carries the configuration message
    assert!(matches!(err, CoreError::Yaml(_)));
    assert!(err.to_string().contains("sum to 1.0"), "{err}");
}

#[test]
fn when_select_count_is_zero_the_definition_is_rejected() {
    let err = IndexDefinition::from_json_str(r#"{"name":"Zero","selection":{"select_count":0}}"#)
        .expect_err("must fail");
    assert!(err.to_string().contains("select count"), "{err}");
}

#[test]
fn when_a_weighting_scheme_is_unknown_the_definition_is_rejected() {
    let err = IndexDefinition::from_json_str(
        r#"{"name":"X","selection":{"select_count":1},"weighting":{"scheme":"custom"}}"#,
    )
    .expect_err("must fail");
    assert!(err.to_string().contains("unknown weighting scheme"), "{err}");
}

#[test]
fn when_the_file_is_missing_the_error_names_the_path() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("missing.yaml");

    let err = IndexDefinition::load(&missing).expect_err("must fail");

    assert!(matches!(err, CoreError::Io { .. }));
    assert!(err.to_string().contains("missing.yaml"));
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn when_a_snapshot_has_a_bad_ticker_loading_fails() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "bad.json", r#"[{"ticker":"","market_cap":1.0}]"#);

    let err = load_candidates(&path).expect_err("must fail");

    assert!(err.to_string().contains(&ConfigError::EmptyTicker.to_string()));
}

#[test]
fn when_user_composes_from_files_the_definition_drives_the_result() {
    // Given: The dividend definition and a six-company snapshot
    let dir = tempdir().expect("tempdir");
    let definition =
        IndexDefinition::load(write(&dir, "dividend.yml", DIVIDEND_INDEX)).expect("loads");
    let candidates = load_candidates(write(&dir, "snapshot.json", SNAPSHOT)).expect("loads");

    // When: Composing
    let composition = compose(&definition, &candidates, None);

    // Then: Financials and small caps are out, at most two US names, equal weights
    let tickers = tickers(&composition.constituents);
    assert_eq!(tickers.len(), 3);
    assert!(!tickers.contains(&"BANK"));
    assert!(!tickers.contains(&"TINY"));
    assert!(tickers.contains(&"DDD"));
    for member in &composition.constituents {
        assert!((member.weight() - 1.0 / 3.0).abs() < 1e-9);
    }
    assert!(composition.is_valid(), "{}", composition.report);
}
