//! Diagnostic logging to stderr.
//!
//! The filter comes from `FERROINDEX_LOG`, then `RUST_LOG`; without either
//! only warnings are shown (`--verbose` lowers that to debug for ferroindex).

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FERROINDEX_LOG";

fn build_filter(verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if verbose {
        EnvFilter::new("warn,ferroindex_core=debug,ferroindex=debug")
    } else {
        EnvFilter::new("warn")
    }
}

pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
