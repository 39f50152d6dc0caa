//! Prometheus-compatible metrics.
//!
//! Labels are drawn from closed sets (phase names, cue labels, bypass
//! reasons), so no cardinality guard is needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::StormfrontError;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global metrics recorder.
///
/// With `port`, a Prometheus listener is started on `127.0.0.1:<port>`;
/// without, the recorder is installed with no HTTP endpoint. A second
/// call is a no-op.
///
/// # Errors
///
/// Returns `StormfrontError::Io` if the recorder or listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), StormfrontError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| StormfrontError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "stormfront_phases_total",
        "Choreography phases entered, by phase"
    );
    describe_gauge!(
        "stormfront_current_phase",
        "Currently active phase (1 = active)"
    );
    describe_counter!("stormfront_cues_total", "Timeline cues issued, by cue");
    describe_counter!(
        "stormfront_bypass_total",
        "Runs that skipped straight to the final state, by reason"
    );
    describe_counter!(
        "stormfront_ambient_pulses_total",
        "Ambient flash loop effects, by kind"
    );
    describe_counter!(
        "stormfront_particle_failures_total",
        "Particle simulation launch failures"
    );
    describe_histogram!(
        "stormfront_sequence_duration_ms",
        "Time from invocation to the end of settle"
    );
}

/// Records entry into a phase and moves the current-phase gauge.
pub fn record_phase(phase: &'static str, previous: Option<&'static str>) {
    counter!("stormfront_phases_total", "phase" => phase).increment(1);
    if let Some(prev) = previous {
        gauge!("stormfront_current_phase", "phase" => prev).set(0.0);
    }
    gauge!("stormfront_current_phase", "phase" => phase).set(1.0);
}

/// Records an issued cue.
pub fn record_cue(cue: &'static str, skipped: bool) {
    let status = if skipped { "skipped" } else { "issued" };
    counter!("stormfront_cues_total", "cue" => cue, "status" => status).increment(1);
}

/// Records a bypassed run.
pub fn record_bypass(reason: &'static str) {
    counter!("stormfront_bypass_total", "reason" => reason).increment(1);
}

/// Records one ambient flash loop effect.
pub fn record_ambient_pulse(kind: &'static str) {
    counter!("stormfront_ambient_pulses_total", "kind" => kind).increment(1);
}

/// Records a particle launch failure.
pub fn record_particle_failure() {
    counter!("stormfront_particle_failures_total").increment(1);
}

/// Records the length of a played sequence.
pub fn record_sequence_duration(duration: Duration) {
    histogram!("stormfront_sequence_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_phase("impact", Some("anticipation"));
        record_cue("flash", false);
        record_cue("slash", true);
        record_bypass("reduced_motion");
        record_ambient_pulse("flicker");
        record_particle_failure();
        record_sequence_duration(Duration::from_millis(4400));
    }
}
