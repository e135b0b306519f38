mod compose;
mod rank;
mod schedule;
mod validate;

use std::time::Instant;

use ferroindex_core::{Envelope, EnvelopeError, EnvelopeMeta, Severity, ValidationReport};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub index: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            index: None,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Blocking findings become envelope errors, warnings become meta warnings.
    pub fn with_report(mut self, report: &ValidationReport) -> Result<Self, CliError> {
        for finding in report.findings() {
            match finding.severity {
                Severity::Error => self.errors.push(
                    EnvelopeError::new("validation_error", finding.message.clone())?
                        .with_field(finding.field.clone()),
                ),
                Severity::Warning => self
                    .warnings
                    .push(format!("{}: {}", finding.field, finding.message)),
                Severity::Info => {}
            }
        }
        Ok(self)
    }
}

pub fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();

    let command_result = match &cli.command {
        Command::Compose(args) => compose::run(args)?,
        Command::Rank(args) => rank::run(args)?,
        Command::Validate(args) => validate::run(args)?,
        Command::Schedule(args) => schedule::run(args)?,
    };

    let CommandResult {
        data,
        index,
        warnings,
        errors,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::new(Uuid::new_v4().to_string(), latency_ms)?;
    if let Some(index) = index {
        meta = meta.with_index(index);
    }
    for warning in warnings {
        meta.push_warning(warning);
    }

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

#[cfg(test)]
mod tests {
    use ferroindex_core::Finding;

    use super::*;

    #[test]
    fn report_findings_split_by_severity() {
        let mut report = ValidationReport::new();
        report.push(Finding::new(
            "weight.AAPL",
            "Constituent weight exceeds maximum",
            Severity::Error,
        ));
        report.push(Finding::new(
            "total_weight",
            "Weights do not sum to 1.0",
            Severity::Warning,
        ));
        report.push_info("note", "informational");

        let result = CommandResult::ok(Value::Null)
            .with_report(&report)
            .expect("valid findings");

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field.as_deref(), Some("weight.AAPL"));
        assert_eq!(
            result.warnings,
            vec!["total_weight: Weights do not sum to 1.0".to_owned()]
        );
    }
}
