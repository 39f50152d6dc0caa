//! `stormfront` - choreographed lightning entrance sequence

use clap::Parser;
use clap::error::ErrorKind;
use tokio::sync::watch;

use stormfront::cli::args::Cli;
use stormfront::cli::commands;
use stormfront::error::ExitCode;
use stormfront::observability::{StopReason, init_logging};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::USAGE_ERROR,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if !cli.quiet {
        init_logging(cli.log_format.into(), cli.verbose, cli.color);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(None);

    // First signal asks the run to stop; a second one forces the exit.
    tokio::spawn(async move {
        let reason = next_signal().await;
        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
        let _ = shutdown_tx.send(Some(reason));

        let code = match next_signal().await {
            StopReason::Terminated => ExitCode::TERMINATED,
            _ => ExitCode::INTERRUPTED,
        };
        std::process::exit(code);
    });

    let result = commands::dispatch(cli, shutdown_rx).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

#[cfg(unix)]
async fn next_signal() -> StopReason {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => tokio::select! {
            _ = tokio::signal::ctrl_c() => StopReason::Interrupted,
            _ = sigterm.recv() => StopReason::Terminated,
        },
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
            StopReason::Interrupted
        }
    }
}

#[cfg(not(unix))]
async fn next_signal() -> StopReason {
    let _ = tokio::signal::ctrl_c().await;
    StopReason::Interrupted
}
