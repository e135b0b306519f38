//! Behavior-driven tests for index composition
//!
//! These tests walk candidates through ranking, selection, weighting and
//! validation the way an index committee would, checking the outcomes a
//! user sees rather than intermediate state.

use ferroindex_core::{
    compose, rank, select, validate, BufferRule, Candidate, CompositeScore, ConfigError,
    DiversificationConstraint, Factor, FactorSpec, IndexDefinition, RankingConfig,
    SelectionCriteria, Severity, Universe, ValidationRules, WeightCaps, WeightedFactor,
    WeightingMethod,
};
use ferroindex_tests::{candidate, tickers};

// =============================================================================
// Ranking
// =============================================================================

#[test]
fn when_no_ranking_is_configured_largest_companies_rank_first() {
    // Given: Three candidates of different size
    let candidates = vec![
        candidate("MID", 2e11),
        candidate("MEGA", 3e12),
        candidate("SMALL", 5e9),
    ];

    // When: Ranking with the default configuration
    let ranked = rank(&candidates, &RankingConfig::default());

    // Then: Market cap decides the order
    let order: Vec<&str> = ranked
        .iter()
        .map(|item| item.candidate.ticker().as_str())
        .collect();
    assert_eq!(order, vec!["MEGA", "MID", "SMALL"]);
}

#[test]
fn when_candidates_lack_the_ranking_factor_they_keep_input_order_at_the_bottom() {
    // Given: Two dividend payers and two candidates without a yield
    let candidates = vec![
        candidate("NODIV1", 1e9),
        candidate("HIGH", 1e9).with_dividend_yield(0.05).expect("valid"),
        candidate("NODIV2", 1e9),
        candidate("LOW", 1e9).with_dividend_yield(0.01).expect("valid"),
    ];

    // When: Ranking by dividend yield
    let ranked = rank(
        &candidates,
        &RankingConfig::by_factor(FactorSpec::descending(Factor::DividendYield)),
    );

    // Then: Payers lead, the zero scores tie and keep their input order
    let order: Vec<&str> = ranked
        .iter()
        .map(|item| item.candidate.ticker().as_str())
        .collect();
    assert_eq!(order, vec!["HIGH", "LOW", "NODIV1", "NODIV2"]);
    assert_eq!(ranked[2].score, 0.0);
    assert_eq!(ranked[3].score, 0.0);
}

#[test]
fn when_composite_weights_do_not_sum_to_one_construction_fails() {
    // Given: Composite factor weights summing to 0.8
    let factors = vec![
        WeightedFactor::new(Factor::MarketCap, 0.5).expect("valid"),
        WeightedFactor::new(Factor::DividendYield, 0.3).expect("valid"),
    ];

    // When: Building the composite
    let err = CompositeScore::new(factors, Vec::new()).expect_err("must fail");

    // Then: The error names the sum rule
    assert!(matches!(err, ConfigError::CompositeWeightSum { .. }));
    assert!(err.to_string().contains("sum to 1.0"));
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn when_an_incumbent_is_inside_the_remove_threshold_it_keeps_its_seat() {
    // Given: Five candidates ranked A..E and D is a current member
    let candidates = vec![
        candidate("A", 500.0),
        candidate("B", 400.0),
        candidate("C", 300.0),
        candidate("D", 200.0),
        candidate("E", 100.0),
    ];
    let previous = vec![candidate("D", 200.0)];
    let criteria = SelectionCriteria::new(3)
        .expect("valid")
        .with_buffer(BufferRule::new(Some(2), Some(5)).expect("valid"));

    // When: Selecting with the buffer
    let ranked = rank(&candidates, &RankingConfig::default());
    let selected = select(&ranked, Some(previous.as_slice()), &criteria);

    // Then: D stays, C cannot enter from rank 3
    assert_eq!(tickers(&selected), vec!["A", "B", "D"]);
}

#[test]
fn when_there_is_no_previous_membership_the_buffer_is_ignored() {
    // Given: The same buffer but a first-time composition
    let candidates = vec![
        candidate("A", 500.0),
        candidate("B", 400.0),
        candidate("C", 300.0),
    ];
    let criteria = SelectionCriteria::new(3)
        .expect("valid")
        .with_buffer(BufferRule::new(Some(1), Some(2)).expect("valid"));

    // When: Selecting without a previous membership
    let ranked = rank(&candidates, &RankingConfig::default());
    let selected = select(&ranked, None, &criteria);

    // Then: Plain top-N
    assert_eq!(tickers(&selected), vec!["A", "B", "C"]);
}

#[test]
fn when_a_country_quota_is_set_no_country_exceeds_it() {
    // Given: Five large US companies followed by one UK and one German
    let mut candidates: Vec<Candidate> = (0..5)
        .map(|index| {
            candidate(&format!("US{index}"), 1e12 - index as f64 * 1e10).with_country("US")
        })
        .collect();
    candidates.push(candidate("UK0", 5e11).with_country("UK"));
    candidates.push(candidate("DE0", 4e11).with_country("DE"));
    let criteria = SelectionCriteria::new(4)
        .expect("valid")
        .with_diversification(DiversificationConstraint::new(Some(2), None, None).expect("valid"));

    // When: Selecting four members
    let ranked = rank(&candidates, &RankingConfig::default());
    let selected = select(&ranked, None, &criteria);

    // Then: At most two US names make it in
    let us_count = selected
        .iter()
        .filter(|member| member.country == "US")
        .count();
    assert!(us_count <= 2, "got {us_count} US members");
    assert_eq!(selected.len(), 4);
    assert_eq!(tickers(&selected), vec!["US0", "US1", "UK0", "DE0"]);
}

#[test]
fn when_quotas_leave_too_few_eligible_names_selection_comes_up_short() {
    // Given: Five US names, one UK and one German, at most two per country
    let mut candidates: Vec<Candidate> = (0..5)
        .map(|index| candidate(&format!("US{index}"), 1e12 - index as f64 * 1e10).with_country("US"))
        .collect();
    candidates.push(candidate("UK0", 5e11).with_country("UK"));
    candidates.push(candidate("DE0", 4e11).with_country("DE"));
    let criteria = SelectionCriteria::new(5)
        .expect("valid")
        .with_diversification(DiversificationConstraint::new(Some(2), None, None).expect("valid"));

    // When: Asking for five members
    let ranked = rank(&candidates, &RankingConfig::default());
    let selected = select(&ranked, None, &criteria);

    // Then: Only four can be placed without breaking the quota
    assert_eq!(selected.len(), 4);
    assert_eq!(
        selected.iter().filter(|member| member.country == "US").count(),
        2
    );
}

#[test]
fn when_a_snapshot_repeats_a_ticker_the_index_holds_it_once() {
    // Given: MSFT listed twice under different spellings
    let candidates = vec![
        candidate("MSFT", 3.0),
        candidate("msft", 2.0),
        candidate("AAPL", 1.0),
    ];
    let definition = IndexDefinition::new("Top 2", SelectionCriteria::new(2).expect("valid"))
        .expect("valid")
        .with_weighting(WeightingMethod::equal());

    // When: Composing
    let composition = compose(&definition, &candidates, None);

    // Then: Two distinct members at one half each
    assert_eq!(tickers(&composition.constituents), vec!["MSFT", "AAPL"]);
    let total: f64 = composition
        .constituents
        .iter()
        .map(Candidate::weight)
        .sum();
    assert!((total - 1.0).abs() < 1e-9, "constituents sum to {total}");
    assert!(composition.is_valid(), "{}", composition.report);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn when_several_constituents_are_overweight_each_gets_its_own_error() {
    // Given: Two members above a 30% limit
    let members = vec![
        candidate("A", 1e9).with_weight(0.45).expect("valid"),
        candidate("B", 1e9).with_weight(0.35).expect("valid"),
        candidate("C", 1e9).with_weight(0.20).expect("valid"),
    ];
    let rules = ValidationRules::new()
        .with_max_single_constituent_weight(0.30)
        .expect("valid");

    // When: Validating
    let report = validate(&members, &rules);

    // Then: Two errors, one per ticker, and the report blocks
    let fields: Vec<&str> = report
        .findings()
        .iter()
        .filter(|finding| finding.severity == Severity::Error)
        .map(|finding| finding.field.as_str())
        .collect();
    assert_eq!(fields, vec!["weight.A", "weight.B"]);
    assert!(!report.is_valid());
    assert_eq!(report.error_count(), 2);
}

#[test]
fn when_only_the_market_cap_floor_is_missed_the_report_still_passes() {
    // Given: A small, fully weighted membership
    let members = vec![candidate("A", 1e6).with_weight(1.0).expect("valid")];
    let rules = ValidationRules::new()
        .with_min_total_market_cap(1e9)
        .expect("valid");

    // When: Validating
    let report = validate(&members, &rules);

    // Then: A warning, not an error
    assert!(report.is_valid());
    assert_eq!(report.warning_count(), 1);
    assert!(report.to_string().starts_with("Validation passed with warnings:"));
}

// =============================================================================
// Full composition
// =============================================================================

#[test]
fn when_composing_a_capped_index_the_result_is_valid_and_normalized() {
    // Given: A 40% single cap, a 45% committee limit, and a size floor
    let candidates = vec![
        candidate("AAA", 3e12).with_sector("Tech").with_country("US"),
        candidate("BBB", 2e12).with_sector("Tech").with_country("US"),
        candidate("CCC", 1e12).with_sector("Energy").with_country("UK"),
        candidate("DDD", 1e9).with_sector("Energy").with_country("UK"),
    ];
    let definition = IndexDefinition::new("Capped 3", SelectionCriteria::new(3).expect("valid"))
        .expect("valid")
        .with_universe(
            Universe::new()
                .with_market_cap_range(Some(1e10), None)
                .expect("valid"),
        )
        .with_weighting(
            WeightingMethod::market_cap()
                .with_caps(WeightCaps::new().with_max_weight(0.40).expect("valid")),
        )
        .with_validation(
            ValidationRules::new()
                .with_max_single_constituent_weight(0.45)
                .expect("valid")
                .with_constituent_bounds(Some(3), Some(3))
                .expect("valid"),
        );

    // When: Composing
    let composition = compose(&definition, &candidates, None);

    // Then: Three members, capped at 40%, summing to one, no blocking findings
    assert_eq!(tickers(&composition.constituents), vec!["AAA", "BBB", "CCC"]);
    let total: f64 = composition.weights.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
    for member in &composition.constituents {
        assert!(member.weight() <= 0.40 + 1e-9, "{} overweight", member.ticker());
    }
    assert!((composition.constituents[2].weight() - 0.2).abs() < 1e-9);
    assert!(composition.is_valid(), "{}", composition.report);
}

#[test]
fn when_rebalancing_the_changes_describe_what_moved() {
    // Given: Last period's equal-weighted membership of A and B
    let candidates = vec![
        candidate("A", 300.0),
        candidate("C", 200.0),
        candidate("B", 100.0),
    ];
    let previous = vec![
        candidate("A", 300.0).with_weight(0.5).expect("valid"),
        candidate("B", 100.0).with_weight(0.5).expect("valid"),
    ];
    let definition = IndexDefinition::new("Top 2", SelectionCriteria::new(2).expect("valid"))
        .expect("valid")
        .with_weighting(WeightingMethod::equal());

    // When: Composing against the previous membership
    let composition = compose(&definition, &candidates, Some(previous.as_slice()));

    // Then: C replaces B and half the index turns over
    let changes = &composition.changes;
    assert_eq!(changes.additions.len(), 1);
    assert_eq!(changes.additions[0].as_str(), "C");
    assert_eq!(changes.deletions[0].as_str(), "B");
    assert_eq!(changes.retained[0].as_str(), "A");
    assert!((changes.one_way_turnover - 0.5).abs() < 1e-9);
}
