use ferroindex_core::{load_candidates, validate, IndexDefinition, ValidationReport};
use serde::Serialize;

use crate::cli::ValidateArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ValidateResponseData<'a> {
    constituents: usize,
    valid: bool,
    report: &'a ValidationReport,
}

pub fn run(args: &ValidateArgs) -> Result<CommandResult, CliError> {
    let definition = IndexDefinition::load(&args.definition)?;
    let constituents = load_candidates(&args.constituents)?;

    let report = validate(&constituents, definition.validation());
    let data = ValidateResponseData {
        constituents: constituents.len(),
        valid: report.is_valid(),
        report: &report,
    };

    CommandResult::ok(serde_json::to_value(data)?)
        .with_index(definition.name())
        .with_report(&report)
}
