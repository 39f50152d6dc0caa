//! `run` command handler.
//!
//! Plays the entrance against an in-memory stage on the real clock,
//! streams events as JSONL, lets the ambient session run for the requested
//! window and prints the final element state.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::watch;

use crate::chance::{Chance, SeededChance};
use crate::cli::args::RunArgs;
use crate::config::{ConfigLoader, RunConfig};
use crate::error::StormfrontError;
use crate::motion::{MotionPreference, MotionQuery, MotionSetting};
use crate::observability::{Event, EventEmitter, RunSummary, StopReason};
use crate::particles::DriftLauncher;
use crate::sequence::{BypassReason, EntranceSequence, RunOutcome};
use crate::stage::{Role, Stage};

/// Receives the first shutdown signal, if any.
pub type ShutdownRx = watch::Receiver<Option<StopReason>>;

/// Play the entrance sequence.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded, or an
/// I/O error if the events file cannot be created.
pub async fn run(args: &RunArgs, mut shutdown: ShutdownRx) -> Result<(), StormfrontError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let loader = ConfigLoader::new();
    let loaded = if let Some(ref path) = args.config {
        tracing::info!(config = %path.display(), "loading configuration");
        loader.load(path)?
    } else {
        loader.check(RunConfig::default())?
    };
    let config = apply_overrides(&loaded.config, args);

    let stage = Arc::new(build_stage(&config.stage.elements, &args.missing));
    let chance: Arc<dyn Chance> = Arc::new(SeededChance::new(config.seed));
    let motion: Arc<dyn MotionQuery> = Arc::new(MotionSetting::from(config.motion));
    let events = Arc::new(open_events(args.events.as_deref())?);

    let mut sequence = EntranceSequence::new(Arc::clone(&stage), motion, Arc::clone(&chance))
        .with_events(Arc::clone(&events))
        .with_frame(config.frame_interval)
        .with_ambient_timing(config.ambient.timing());
    if config.stage.particles.enabled {
        let launcher = DriftLauncher::new(config.stage.particles.drift(), chance)
            .with_frame(config.frame_interval);
        sequence = sequence.with_launcher(Arc::new(launcher));
    }

    let started = Instant::now();
    // Signals that arrive while the entrance plays take effect once it ends.
    let outcome = sequence.run_or_reveal().await;

    let reason = match outcome {
        RunOutcome::Bypassed(BypassReason::Failed) => StopReason::Error,
        RunOutcome::Played if !config.ambient.run_for.is_zero() => {
            tracing::info!(
                window = %humantime::format_duration(config.ambient.run_for),
                "ambient session running"
            );
            tokio::select! {
                () = tokio::time::sleep(config.ambient.run_for) => StopReason::Completed,
                reason = stop_requested(&mut shutdown) => reason,
            }
        }
        _ => (*shutdown.borrow()).unwrap_or(StopReason::Completed),
    };

    sequence.stop_ambient();

    let summary = RunSummary {
        outcome: outcome.label().to_string(),
        events_emitted: events.event_count(),
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    tracing::info!(%summary, ?reason, "run stopped");
    events.emit(Event::RunStopped {
        timestamp: Utc::now(),
        reason,
        summary: Some(summary),
    });

    print_snapshot(&stage);
    Ok(())
}

/// Folds command-line flags over the loaded configuration.
fn apply_overrides(config: &RunConfig, args: &RunArgs) -> RunConfig {
    let mut config = config.clone();
    if args.reduced_motion {
        config.motion = MotionPreference::Reduced;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.no_particles {
        config.stage.particles.enabled = false;
    }
    if let Some(window) = args.ambient_for {
        config.ambient.run_for = window;
    }
    config
}

fn build_stage(elements: &[Role], missing: &[Role]) -> Stage {
    for role in missing {
        tracing::debug!(%role, "detaching role");
    }
    Stage::in_memory(
        elements
            .iter()
            .copied()
            .filter(|role| !missing.contains(role)),
    )
}

fn open_events(path: Option<&Path>) -> std::io::Result<EventEmitter> {
    match path {
        Some(p) if p != Path::new("-") => EventEmitter::from_file(p),
        _ => Ok(EventEmitter::stdout()),
    }
}

async fn stop_requested(shutdown: &mut ShutdownRx) -> StopReason {
    let reason = match shutdown.wait_for(Option::is_some).await {
        Ok(current) => *current,
        Err(_) => None,
    };
    match reason {
        Some(reason) => reason,
        // No signal source left; only the window can end the run.
        None => std::future::pending::<StopReason>().await,
    }
}

/// Final element state, one line per attached role, on stderr so stdout
/// stays pure JSONL.
fn print_snapshot(stage: &Stage) {
    for (role, style) in stage.snapshot() {
        let classes: Vec<&str> = style.classes.iter().map(String::as_str).collect();
        eprintln!(
            "{role:<20} visible={:<5} opacity={:.2} scale={:.2} y={:.1} blur={:.1} classes=[{}]",
            style.visible,
            style.opacity,
            style.scale,
            style.translate_y,
            style.blur_px,
            classes.join(",")
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::*;
    use crate::cli::args::{Cli, Commands};

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["stormfront", "run"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn flags_override_file_values() {
        let config = RunConfig {
            seed: Some(1),
            ..RunConfig::default()
        };
        let merged = apply_overrides(
            &config,
            &args(&["--reduced-motion", "--seed", "9", "--no-particles", "--ambient-for", "3s"]),
        );
        assert_eq!(merged.motion, MotionPreference::Reduced);
        assert_eq!(merged.seed, Some(9));
        assert!(!merged.stage.particles.enabled);
        assert_eq!(merged.ambient.run_for, Duration::from_secs(3));
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let config = RunConfig {
            seed: Some(1),
            ..RunConfig::default()
        };
        let merged = apply_overrides(&config, &args(&[]));
        assert_eq!(merged, config);
    }

    #[test]
    fn missing_roles_are_left_off_the_stage() {
        let stage = build_stage(&Role::ALL, &[Role::Title, Role::Burst]);
        assert_eq!(stage.missing_required(), vec![Role::Title]);
        assert!(!stage.contains(Role::Burst));
        assert!(stage.contains(Role::Tagline));
    }

    #[tokio::test]
    async fn stop_requested_returns_the_signal() {
        let (tx, mut rx) = watch::channel(None);
        tx.send(Some(StopReason::Terminated)).unwrap();
        assert_eq!(stop_requested(&mut rx).await, StopReason::Terminated);
    }

    #[test]
    fn dash_means_stdout() {
        assert!(open_events(Some(Path::new("-"))).is_ok());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        assert!(open_events(Some(&path)).is_ok());
        assert!(path.exists());
    }
}
