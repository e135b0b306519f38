use ferroindex_core::{format_date, parse_date, IndexDefinition};
use serde::Serialize;

use crate::cli::ScheduleArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ScheduleResponseData {
    frequency: &'static str,
    dates: Vec<ScheduledRebalance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_after_range: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScheduledRebalance {
    rebalancing_date: String,
    selection_date: String,
    announcement_date: String,
}

pub fn run(args: &ScheduleArgs) -> Result<CommandResult, CliError> {
    let definition = IndexDefinition::load(&args.definition)?;
    let from = parse_date(&args.from)?;
    let to = parse_date(&args.to)?;
    if from > to {
        return Err(CliError::Command(format!(
            "--from {} is after --to {}",
            args.from, args.to
        )));
    }

    let schedule = definition.rebalancing();
    let dates = schedule
        .rebalancing_dates(from, to)
        .into_iter()
        .map(|date| ScheduledRebalance {
            rebalancing_date: format_date(date),
            selection_date: format_date(schedule.selection_date(date)),
            announcement_date: format_date(schedule.announcement_date(date)),
        })
        .collect();

    let data = ScheduleResponseData {
        frequency: schedule.frequency().as_str(),
        dates,
        next_after_range: schedule.next_rebalancing_date(to).map(format_date),
    };

    Ok(CommandResult::ok(serde_json::to_value(data)?).with_index(definition.name()))
}
