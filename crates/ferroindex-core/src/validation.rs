//! Validation engine: checks a weighted membership against declared rules.
//!
//! Findings are data, never errors. Every check runs regardless of the
//! outcome of the others.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Candidate, ConfigError};

const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub field: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    pub fn new(field: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity,
            current_value: None,
            expected: None,
            suggestion: None,
        }
    }

    pub fn with_current_value(mut self, value: impl Into<String>) -> Self {
        self.current_value = Some(value.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl Display for Finding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.field, self.message)?;
        if let Some(current) = &self.current_value {
            write!(f, "\n  Current: {current}")?;
        }
        if let Some(expected) = &self.expected {
            write!(f, "\n  Expected: {expected}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

/// Ordered list of findings. Valid iff it holds no ERROR finding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn push_info(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.push(Finding::new(field, message, Severity::Info));
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.findings.extend(other.findings);
    }

    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .count()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.findings.is_empty() {
            return f.write_str("Validation passed: No issues found");
        }

        let status = if self.is_valid() {
            "passed with warnings"
        } else {
            "failed"
        };
        writeln!(f, "Validation {status}:")?;
        writeln!(
            f,
            "  {} error(s), {} warning(s)",
            self.error_count(),
            self.warning_count()
        )?;
        for finding in &self.findings {
            write!(f, "\n{finding}\n")?;
        }
        Ok(())
    }
}

/// Declared rule set. Unset rules are not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValidationRulesRecord", into = "ValidationRulesRecord")]
pub struct ValidationRules {
    min_constituents: Option<usize>,
    max_constituents: Option<usize>,
    max_single_constituent_weight: Option<f64>,
    max_single_sector_weight: Option<f64>,
    max_single_country_weight: Option<f64>,
    min_total_market_cap: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct ValidationRulesRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    min_constituents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_constituents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_single_constituent_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_single_sector_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_single_country_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_total_market_cap: Option<f64>,
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constituent_bounds(
        mut self,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if min == Some(0) {
            return Err(ConfigError::InvalidConstituentBound {
                field: "min_constituents",
            });
        }
        if max == Some(0) {
            return Err(ConfigError::InvalidConstituentBound {
                field: "max_constituents",
            });
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ConfigError::ConstituentBoundsInverted { min, max });
            }
        }
        self.min_constituents = min;
        self.max_constituents = max;
        Ok(self)
    }

    pub fn with_max_single_constituent_weight(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_single_constituent_weight =
            Some(validate_weight_bound("max_single_constituent_weight", value)?);
        Ok(self)
    }

    pub fn with_max_single_sector_weight(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_single_sector_weight =
            Some(validate_weight_bound("max_single_sector_weight", value)?);
        Ok(self)
    }

    pub fn with_max_single_country_weight(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_single_country_weight =
            Some(validate_weight_bound("max_single_country_weight", value)?);
        Ok(self)
    }

    pub fn with_min_total_market_cap(mut self, value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteValue {
                field: "min_total_market_cap",
            });
        }
        if value < 0.0 {
            return Err(ConfigError::NegativeValue {
                field: "min_total_market_cap",
            });
        }
        self.min_total_market_cap = Some(value);
        Ok(self)
    }

    pub fn min_constituents(&self) -> Option<usize> {
        self.min_constituents
    }

    pub fn max_constituents(&self) -> Option<usize> {
        self.max_constituents
    }

    pub fn max_single_constituent_weight(&self) -> Option<f64> {
        self.max_single_constituent_weight
    }

    pub fn max_single_sector_weight(&self) -> Option<f64> {
        self.max_single_sector_weight
    }

    pub fn max_single_country_weight(&self) -> Option<f64> {
        self.max_single_country_weight
    }

    pub fn min_total_market_cap(&self) -> Option<f64> {
        self.min_total_market_cap
    }
}

impl TryFrom<ValidationRulesRecord> for ValidationRules {
    type Error = ConfigError;

    fn try_from(record: ValidationRulesRecord) -> Result<Self, Self::Error> {
        let mut rules =
            Self::new().with_constituent_bounds(record.min_constituents, record.max_constituents)?;
        if let Some(value) = record.max_single_constituent_weight {
            rules = rules.with_max_single_constituent_weight(value)?;
        }
        if let Some(value) = record.max_single_sector_weight {
            rules = rules.with_max_single_sector_weight(value)?;
        }
        if let Some(value) = record.max_single_country_weight {
            rules = rules.with_max_single_country_weight(value)?;
        }
        if let Some(value) = record.min_total_market_cap {
            rules = rules.with_min_total_market_cap(value)?;
        }
        Ok(rules)
    }
}

impl From<ValidationRules> for ValidationRulesRecord {
    fn from(value: ValidationRules) -> Self {
        Self {
            min_constituents: value.min_constituents,
            max_constituents: value.max_constituents,
            max_single_constituent_weight: value.max_single_constituent_weight,
            max_single_sector_weight: value.max_single_sector_weight,
            max_single_country_weight: value.max_single_country_weight,
            min_total_market_cap: value.min_total_market_cap,
        }
    }
}

fn validate_weight_bound(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::WeightBoundOutOfRange { field, value });
    }
    Ok(value)
}

/// Check a weighted membership against `rules`.
pub fn validate(members: &[Candidate], rules: &ValidationRules) -> ValidationReport {
    let mut report = ValidationReport::new();
    let count = members.len();

    if let Some(min) = rules.min_constituents.filter(|min| count < *min) {
        report.push(
            Finding::new("constituent_count", "Too few constituents", Severity::Error)
                .with_current_value(count.to_string())
                .with_expected(format!("At least {min}"))
                .with_suggestion("Add more constituents or adjust selection criteria"),
        );
    }
    if let Some(max) = rules.max_constituents.filter(|max| count > *max) {
        report.push(
            Finding::new("constituent_count", "Too many constituents", Severity::Error)
                .with_current_value(count.to_string())
                .with_expected(format!("At most {max}"))
                .with_suggestion("Reduce the select count in selection criteria"),
        );
    }

    if let Some(max) = rules.max_single_constituent_weight {
        for member in members.iter().filter(|member| member.weight() > max) {
            report.push(
                Finding::new(
                    format!("weight.{}", member.ticker()),
                    "Constituent weight exceeds maximum",
                    Severity::Error,
                )
                .with_current_value(percent(member.weight()))
                .with_expected(format!("At most {}", percent(max)))
                .with_suggestion("Apply a weight cap in the weighting method"),
            );
        }
    }

    if let Some(max) = rules.max_single_sector_weight {
        for (sector, weight) in group_weights(members, |member| member.sector.as_str()) {
            if weight > max {
                report.push(
                    Finding::new(
                        format!("sector_weight.{sector}"),
                        "Sector weight exceeds maximum",
                        Severity::Error,
                    )
                    .with_current_value(percent(weight))
                    .with_expected(format!("At most {}", percent(max)))
                    .with_suggestion("Apply a sector cap in the weighting method"),
                );
            }
        }
    }

    if let Some(max) = rules.max_single_country_weight {
        for (country, weight) in group_weights(members, |member| member.country.as_str()) {
            if weight > max {
                report.push(
                    Finding::new(
                        format!("country_weight.{country}"),
                        "Country weight exceeds maximum",
                        Severity::Error,
                    )
                    .with_current_value(percent(weight))
                    .with_expected(format!("At most {}", percent(max)))
                    .with_suggestion("Apply a country cap in the weighting method"),
                );
            }
        }
    }

    if let Some(min) = rules.min_total_market_cap {
        let total: f64 = members.iter().map(Candidate::market_cap).sum();
        if total < min {
            report.push(
                Finding::new(
                    "total_market_cap",
                    "Total market cap below minimum",
                    Severity::Warning,
                )
                .with_current_value(amount(total))
                .with_expected(format!("At least {}", amount(min))),
            );
        }
    }

    let total_weight: f64 = members.iter().map(Candidate::weight).sum();
    if (total_weight - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        report.push(
            Finding::new("total_weight", "Weights do not sum to 1.0", Severity::Warning)
                .with_current_value(format!("{total_weight:.4}"))
                .with_expected("1.0000")
                .with_suggestion("Ensure the weighting method normalizes weights"),
        );
    }

    info!(
        constituents = count,
        errors = report.error_count(),
        warnings = report.warning_count(),
        "validation complete"
    );
    report
}

/// Sum weights per group, in first-seen group order.
fn group_weights<'a>(
    members: &'a [Candidate],
    group_of: impl Fn(&'a Candidate) -> &'a str,
) -> Vec<(&'a str, f64)> {
    let mut order: Vec<(&'a str, f64)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for member in members {
        let group = group_of(member);
        match index.get(group) {
            Some(position) => order[*position].1 += member.weight(),
            None => {
                index.insert(group, order.len());
                order.push((group, member.weight()));
            }
        }
    }
    order
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Whole currency units with thousands separators, e.g. `$1,250,000`.
fn amount(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, ch) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}")
}
