//! Logging initialization.
//!
//! `tracing` output on stderr, human or JSON. Verbosity flags raise the
//! level of `stormfront`'s own targets only; dependencies stay at `warn`
//! unless `STORMFRONT_LOG_LEVEL` asks otherwise. Human output stamps each
//! line with time since start, which lines up with the `at_ms` offsets in
//! the event stream.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::uptime;

use crate::cli::args::ColorChoice;

/// Environment variable holding a full filter, replacing the flags.
pub const LOG_LEVEL_ENV: &str = "STORMFRONT_LOG_LEVEL";

/// Level applied to targets outside this crate.
const DEPENDENCY_LEVEL: &str = "warn";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Filter directive for a `-v` count.
///
/// Without flags only warnings and the bypass/failure reports surface;
/// `-v` adds phase transitions, `-vv` every cue, `-vvv` frame-level
/// scheduling.
#[must_use]
pub fn directive_for(verbosity: u8) -> String {
    let own = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("{DEPENDENCY_LEVEL},{}={own}", env!("CARGO_CRATE_NAME"))
}

/// Initializes the global subscriber. Safe to call more than once.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(directive_for(verbosity)));

    let ansi = match color {
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Human => builder
            .with_timer(uptime())
            .with_ansi(ansi)
            .with_target(verbosity >= 2)
            .try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
}
