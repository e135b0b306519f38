use ferroindex_core::{compose, load_candidates, IndexDefinition};
use tracing::debug;

use crate::cli::ComposeArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &ComposeArgs) -> Result<CommandResult, CliError> {
    let definition = IndexDefinition::load(&args.definition)?;
    let candidates = load_candidates(&args.candidates)?;
    let previous = args.previous.as_ref().map(load_candidates).transpose()?;
    debug!(
        index = definition.name(),
        candidates = candidates.len(),
        previous = previous.as_ref().map_or(0, Vec::len),
        "inputs loaded"
    );

    let composition = compose(&definition, &candidates, previous.as_deref());

    let mut result = CommandResult::ok(serde_json::to_value(&composition)?)
        .with_index(definition.name())
        .with_report(&composition.report)?;
    if composition.constituents.len() < definition.selection().select_count() {
        result = result.with_warning(format!(
            "selected {} of {} requested constituents",
            composition.constituents.len(),
            definition.selection().select_count()
        ));
    }
    Ok(result)
}
