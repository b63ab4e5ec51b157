//! Log output setup for the CLI.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Overrides the verbosity flag when set, e.g. `JOBMATCH_LOG=jobmatch=trace`
pub const LOG_ENV: &str = "JOBMATCH_LOG";

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "warn,jobmatch=debug",
        _ => "debug",
    }
}

/// Install the global subscriber. Logs go to stderr so `--json` output on
/// stdout stays parseable. Calling twice is a no-op.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
