//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod plan;
pub mod run;
pub mod version;

pub use run::ShutdownRx;

use crate::cli::args::{Cli, Commands};
use crate::error::StormfrontError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, shutdown: ShutdownRx) -> Result<(), StormfrontError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, shutdown).await,
        Commands::Plan(args) => plan::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
