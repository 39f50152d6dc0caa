//! `plan` command handler.
//!
//! Prints the entrance timeline without playing it.

use std::fmt::Write as _;

use serde::Serialize;

use crate::cli::args::{OutputFormat, PlanArgs};
use crate::error::StormfrontError;
use crate::sequence::{Cue, Phase, Step, Timeline, entrance_timeline};

#[derive(Serialize)]
struct PhasePlan {
    phase: Phase,
    nominal_ms: Option<u128>,
}

#[derive(Serialize)]
struct Plan<'a> {
    phases: Vec<PhasePlan>,
    bounded_total_ms: u128,
    steps: &'a Timeline<Cue>,
}

/// Print the choreography.
///
/// # Errors
///
/// Returns a JSON error if the plan cannot be serialized.
pub fn run(args: &PlanArgs) -> Result<(), StormfrontError> {
    let timeline = entrance_timeline();
    match args.format {
        OutputFormat::Human => print!("{}", render(&timeline)),
        OutputFormat::Json => {
            let plan = Plan {
                phases: Phase::ALL
                    .into_iter()
                    .map(|phase| PhasePlan {
                        phase,
                        nominal_ms: phase.nominal().map(|d| d.as_millis()),
                    })
                    .collect(),
                bounded_total_ms: Phase::bounded_total().as_millis(),
                steps: &timeline,
            };
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }
    Ok(())
}

/// One line per phase header and per cue.
fn render(timeline: &Timeline<Cue>) -> String {
    let mut out = String::new();
    for step in timeline.steps() {
        match step {
            Step::Enter { phase } => {
                let nominal = phase
                    .nominal()
                    .map_or_else(|| "unbounded".to_string(), |d| format!("{}ms", d.as_millis()));
                let _ = writeln!(out, "{phase} ({nominal})");
            }
            Step::Cue { anchor, delay, cue } => {
                let blocking = if cue.is_blocking() { "  [waits]" } else { "" };
                let _ = writeln!(
                    out,
                    "  {anchor:<13} +{:>4}ms  {cue}{blocking}",
                    delay.as_millis()
                );
            }
        }
    }
    out
}
