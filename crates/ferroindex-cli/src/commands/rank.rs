use ferroindex_core::{load_candidates, rank, IndexDefinition, Ticker};
use serde::Serialize;

use crate::cli::RankArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct RankResponseData {
    strategy: &'static str,
    eligible: usize,
    ranked: Vec<RankedRow>,
}

#[derive(Debug, Serialize)]
struct RankedRow {
    rank: usize,
    ticker: Ticker,
    name: String,
    score: f64,
}

pub fn run(args: &RankArgs) -> Result<CommandResult, CliError> {
    let definition = IndexDefinition::load(&args.definition)?;
    let candidates = load_candidates(&args.candidates)?;

    let eligible = definition.universe().filter(&candidates);
    let ranked = rank(&eligible, definition.ranking());
    let limit = args.limit.unwrap_or(ranked.len());

    let data = RankResponseData {
        strategy: definition.ranking().strategy().as_str(),
        eligible: eligible.len(),
        ranked: ranked
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, item)| RankedRow {
                rank: index + 1,
                ticker: item.candidate.ticker().clone(),
                name: item.candidate.name.clone(),
                score: item.score,
            })
            .collect(),
    };

    Ok(CommandResult::ok(serde_json::to_value(data)?).with_index(definition.name()))
}
