//! CLI argument definitions.
//!
//! All Clap derive structs for `stormfront` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::parse_duration;
use crate::observability::LogFormat;
use crate::stage::Role;

// ============================================================================
// Root CLI
// ============================================================================

/// Choreographed lightning entrance sequence.
#[derive(Parser, Debug)]
#[command(name = "stormfront", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "STORMFRONT_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "STORMFRONT_LOG_FORMAT")]
    pub log_format: LogFormatArg,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play the entrance sequence against an in-memory stage.
    Run(RunArgs),

    /// Print the choreography timeline without playing it.
    Plan(PlanArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Run / Plan
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "STORMFRONT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Behave as if the user prefers reduced motion.
    #[arg(long)]
    pub reduced_motion: bool,

    /// Detach a role from the stage before playing (repeatable).
    #[arg(long, value_name = "ROLE", value_parser = role_value_parser())]
    pub missing: Vec<Role>,

    /// Seed for every random branch point.
    #[arg(long, env = "STORMFRONT_SEED")]
    pub seed: Option<u64>,

    /// Write JSONL events to a file, or `-` for stdout.
    #[arg(long, value_name = "FILE|-", env = "STORMFRONT_EVENTS")]
    pub events: Option<PathBuf>,

    /// How long to let the ambient loop run before stopping it.
    #[arg(long, value_parser = parse_duration_arg)]
    pub ambient_for: Option<Duration>,

    /// Skip the particle simulation.
    #[arg(long)]
    pub no_particles: bool,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "STORMFRONT_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Human => Self::Human,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/// Role names as possible values, so help and completions list them.
fn role_value_parser() -> impl TypedValueParser<Value = Role> {
    PossibleValuesParser::new(Role::ALL.map(Role::as_str)).try_map(|name| name.parse::<Role>())
}

// ============================================================================
// Tests
// ============================================================================
