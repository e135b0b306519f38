//! CLI argument definitions for ferroindex.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `compose` | Build an index from a definition and a candidate snapshot |
//! | `rank` | Show the ranked eligible candidates |
//! | `validate` | Check a weighted membership against the definition's rules |
//! | `schedule` | List rebalancing dates in a range |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! ferroindex compose --definition index.yaml --candidates universe.json --pretty
//! ferroindex rank --definition index.yaml --candidates universe.json --limit 20
//! ferroindex schedule --definition index.yaml --from 2024-01-01 --to 2024-12-31
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Rule-based index construction from candidate snapshots.
#[derive(Debug, Parser)]
#[command(
    name = "ferroindex",
    author,
    version,
    about = "Rule-based index construction",
    long_about = "ferroindex ranks, selects, weights and validates index constituents \
from a declarative index definition (JSON or YAML) and a candidate snapshot.\n\
\n\
Use 'ferroindex <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Emit debug logs on stderr.
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compose an index: filter, rank, select, weight and validate.
    ///
    /// # Examples
    ///
    ///   ferroindex compose --definition index.yaml --candidates universe.json
    ///   ferroindex compose --definition index.json --candidates q2.json --previous q1.json
    Compose(ComposeArgs),

    /// Rank eligible candidates without selecting or weighting.
    Rank(RankArgs),

    /// Validate a weighted membership against the definition's rules.
    Validate(ValidateArgs),

    /// List rebalancing, selection and announcement dates.
    Schedule(ScheduleArgs),
}

/// Arguments for the `compose` command.
#[derive(Debug, Args)]
pub struct ComposeArgs {
    /// Index definition file (.json, .yaml or .yml).
    #[arg(long, short = 'd')]
    pub definition: PathBuf,

    /// Candidate snapshot file.
    #[arg(long, short = 'c')]
    pub candidates: PathBuf,

    /// Previous membership, enables buffers and change tracking.
    #[arg(long)]
    pub previous: Option<PathBuf>,
}

/// Arguments for the `rank` command.
#[derive(Debug, Args)]
pub struct RankArgs {
    #[arg(long, short = 'd')]
    pub definition: PathBuf,

    #[arg(long, short = 'c')]
    pub candidates: PathBuf,

    /// Only show the top N (default: all).
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for the `validate` command.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long, short = 'd')]
    pub definition: PathBuf,

    /// Weighted membership to check.
    #[arg(long)]
    pub constituents: PathBuf,
}

/// Arguments for the `schedule` command.
#[derive(Debug, Args)]
pub struct ScheduleArgs {
    #[arg(long, short = 'd')]
    pub definition: PathBuf,

    /// First date of the range (YYYY-MM-DD).
    #[arg(long)]
    pub from: String,

    /// Last date of the range (YYYY-MM-DD).
    #[arg(long)]
    pub to: String,
}
