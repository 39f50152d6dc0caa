//! Entrance sequence orchestration.
//!
//! [`EntranceSequence`] resolves the stage, decides between playing and
//! bypassing, performs the initialization side effects and plays the
//! fixed [`entrance_timeline`] through a [`Director`]. The timeline itself
//! is plain data interpreted by [`Timeline::play`].
//!
//! # Architecture
//!
//! - [`phase`] — the five phases and their nominal durations
//! - [`timeline`] — steps, anchors and the scheduler
//! - [`choreography`] — the [`Cue`] vocabulary and the entrance timeline
//! - [`cues`] — class-pulse effects with cancellable reverts
//! - [`reveal`] — hidden states, reveal transitions, reveal-everything
//! - [`director`] — runs cues against the resolved cast
//! - [`ambient`] — the stoppable ambient session

pub mod ambient;
pub mod choreography;
pub mod cues;
pub mod director;
pub mod phase;
pub mod reveal;
pub mod timeline;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chance::Chance;
use crate::error::{ParticleError, SequenceError};
use crate::flash::{AmbientTiming, FlashEngine};
use crate::motion::MotionQuery;
use crate::observability::{Event, EventEmitter, metrics};
use crate::particles::{ParticleLauncher, ParticleSystem};
use crate::stage::{Role, Stage};
use crate::tween::DEFAULT_FRAME;

pub use ambient::{AmbientSession, SessionStatus};
pub use choreography::{Cue, entrance_timeline};
pub use director::Director;
pub use phase::Phase;
pub use reveal::Cast;
pub use timeline::{Anchor, CueRunner, Step, Timeline};

/// Why the choreography was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "missing", rename_all = "snake_case")]
pub enum BypassReason {
    /// The host asked for reduced motion.
    ReducedMotion,
    /// Required elements were not attached.
    MissingElements(Vec<Role>),
    /// The timeline failed part-way.
    Failed,
}

impl BypassReason {
    /// Stable label, also used as the metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReducedMotion => "reduced_motion",
            Self::MissingElements(_) => "missing_elements",
            Self::Failed => "failed",
        }
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The full choreography played and the ambient session was started.
    Played,
    /// The final state was rendered directly.
    Bypassed(BypassReason),
}

impl RunOutcome {
    /// `played`, `bypassed` or `failed`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Played => "played",
            Self::Bypassed(BypassReason::Failed) => "failed",
            Self::Bypassed(_) => "bypassed",
        }
    }
}

/// The lightning entrance over one stage.
pub struct EntranceSequence {
    stage: Arc<Stage>,
    motion: Arc<dyn MotionQuery>,
    chance: Arc<dyn Chance>,
    launcher: Option<Arc<dyn ParticleLauncher>>,
    events: Arc<EventEmitter>,
    frame: Duration,
    ambient_timing: AmbientTiming,
    session: AmbientSession,
    particles: Mutex<Option<Arc<dyn ParticleSystem>>>,
}

impl EntranceSequence {
    /// Creates a sequence with no particle launcher and a silent event
    /// stream.
    #[must_use]
    pub fn new(stage: Arc<Stage>, motion: Arc<dyn MotionQuery>, chance: Arc<dyn Chance>) -> Self {
        let events = Arc::new(EventEmitter::noop());
        Self {
            session: AmbientSession::new(Arc::clone(&stage), Arc::clone(&events)),
            stage,
            motion,
            chance,
            launcher: None,
            events,
            frame: DEFAULT_FRAME,
            ambient_timing: AmbientTiming::default(),
            particles: Mutex::new(None),
        }
    }

    /// Launches particles against the container at the start of each run.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ParticleLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Routes structured events to `events`.
    ///
    /// Replaces the (still idle) ambient session so it reports to the same
    /// stream.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.session = AmbientSession::new(Arc::clone(&self.stage), Arc::clone(&events));
        self.events = events;
        self
    }

    /// Sets the frame interval for eased transitions.
    #[must_use]
    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame;
        self
    }

    /// Sets the ambient flash loop timing.
    #[must_use]
    pub fn with_ambient_timing(mut self, timing: AmbientTiming) -> Self {
        self.ambient_timing = timing;
        self
    }

    /// The stage this sequence animates.
    #[must_use]
    pub fn stage(&self) -> &Arc<Stage> {
        &self.stage
    }

    /// Handle to this sequence's ambient session.
    #[must_use]
    pub fn ambient(&self) -> AmbientSession {
        self.session.clone()
    }

    /// Stops the ambient session. Safe at any time, any number of times.
    pub fn stop_ambient(&self) {
        self.session.stop();
    }

    /// Particle handle launched by the last run, if any.
    #[must_use]
    pub fn particles(&self) -> Option<Arc<dyn ParticleSystem>> {
        self.particles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Renders the final revealed state immediately.
    pub fn reveal_immediately(&self) {
        reveal::reveal_all(&self.stage);
    }

    /// Plays the entrance.
    ///
    /// Resolves once settle has finished and the ambient session has been
    /// started, or immediately when the run is bypassed. Never waits on
    /// the ambient session.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::StepFailed`] if a blocking effect panics,
    /// or [`SequenceError::Panicked`] if any other step does.
    /// The stage may then be mid-transition; see
    /// [`run_or_reveal`](Self::run_or_reveal).
    pub async fn run(&self) -> Result<RunOutcome, SequenceError> {
        let run_id = Uuid::new_v4();
        let reduced = self.motion.prefers_reduced_motion();
        info!(%run_id, reduced, "entrance sequence started");
        self.events.emit(Event::SequenceStarted {
            timestamp: Utc::now(),
            run_id,
            reduced_motion: reduced,
        });

        if reduced {
            return Ok(self.bypass(BypassReason::ReducedMotion));
        }
        let cast = match Cast::resolve(&self.stage) {
            Ok(cast) => cast,
            Err(missing) => {
                warn!(?missing, "required elements missing; skipping animation");
                return Ok(self.bypass(BypassReason::MissingElements(missing)));
            }
        };

        let cancel = self.session.token().child_token();
        let played = AssertUnwindSafe(self.play(cast, cancel.clone()))
            .catch_unwind()
            .await;
        let result = played.unwrap_or_else(|payload| {
            Err(SequenceError::Panicked {
                message: panic_message(payload.as_ref()),
            })
        });
        if result.is_err() {
            // lift effect classes and drop the deferred glitch
            cancel.cancel();
        }
        result
    }

    async fn play(
        &self,
        cast: Cast,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, SequenceError> {
        let started = Instant::now();
        let particles = self.launch_particles(&cast).await;
        if let Some(loader) = &cast.loader {
            reveal::hide_loader(Arc::clone(loader), self.frame);
        }
        reveal::show_content(cast.content.as_ref());
        reveal::prepare_hidden(&cast);

        let director = Director {
            cast,
            engine: FlashEngine::new(Arc::clone(&self.motion), Arc::clone(&self.chance)),
            motion: Arc::clone(&self.motion),
            particles,
            session: self.session.clone(),
            ambient_timing: self.ambient_timing,
            frame: self.frame,
            events: Arc::clone(&self.events),
            cancel,
        };
        entrance_timeline().play(&director).await?;

        let elapsed = started.elapsed();
        metrics::record_sequence_duration(elapsed);
        info!(elapsed_ms = elapsed.as_millis(), "entrance sequence completed");
        self.events.emit(Event::SequenceCompleted {
            timestamp: Utc::now(),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
        Ok(RunOutcome::Played)
    }

    /// Plays the entrance, falling back to the final revealed state on any
    /// failure.
    pub async fn run_or_reveal(&self) -> RunOutcome {
        match self.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "entrance sequence failed; revealing content");
                self.bypass(BypassReason::Failed)
            }
        }
    }

    async fn launch_particles(&self, cast: &Cast) -> Option<Arc<dyn ParticleSystem>> {
        let launcher = self.launcher.as_ref()?;
        let result = match &cast.particle_container {
            Some(container) => launcher.launch(Arc::clone(container)).await,
            None => Err(ParticleError::MissingContainer),
        };
        match result {
            Ok(system) => {
                debug!(live = system.live_count(), "particles launched");
                *self.particles.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&system));
                Some(system)
            }
            Err(ParticleError::MissingContainer) => {
                debug!("no particle container; running without particles");
                None
            }
            Err(e) => {
                warn!(error = %e, "particle launch failed; running without particles");
                metrics::record_particle_failure();
                None
            }
        }
    }

    fn bypass(&self, reason: BypassReason) -> RunOutcome {
        reveal::reveal_all(&self.stage);
        metrics::record_bypass(reason.as_str());
        info!(reason = reason.as_str(), "entrance bypassed");

        let missing = match &reason {
            BypassReason::MissingElements(roles) => {
                roles.iter().map(|r| r.as_str().to_string()).collect()
            }
            _ => Vec::new(),
        };
        self.events.emit(Event::SequenceBypassed {
            timestamp: Utc::now(),
            reason: reason.as_str().to_string(),
            missing,
        });
        RunOutcome::Bypassed(reason)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl std::fmt::Debug for EntranceSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntranceSequence")
            .field("stage", &self.stage)
            .field("frame", &self.frame)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::chance::ScriptedChance;
    use crate::motion::MotionSetting;
    use crate::stage::Element;

    #[derive(Default)]
    struct FailingLauncher {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ParticleLauncher for FailingLauncher {
        async fn launch(
            &self,
            _container: Arc<dyn Element>,
        ) -> crate::particles::Result<Arc<dyn ParticleSystem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ParticleError::LaunchFailed("no canvas".into()))
        }
    }

    fn sequence(stage: Arc<Stage>, reduced: bool) -> (EntranceSequence, Arc<FailingLauncher>) {
        let launcher = Arc::new(FailingLauncher::default());
        let seq = EntranceSequence::new(
            stage,
            Arc::new(MotionSetting::new(reduced)),
            Arc::new(ScriptedChance::constant(0.99)),
        )
        .with_launcher(Arc::clone(&launcher) as Arc<dyn ParticleLauncher>);
        (seq, launcher)
    }

    fn assert_final_state(stage: &Stage) {
        for role in Role::TEXT {
            let style = stage.get(role).unwrap().style();
            assert!(style.is_at_rest() && style.visible, "{role} not revealed");
        }
        assert!(stage.get(Role::Content).unwrap().style().visible);
    }

    #[tokio::test(start_paused = true)]
    async fn reduced_motion_bypasses_without_launching() {
        let stage = Arc::new(Stage::complete());
        let (seq, launcher) = sequence(Arc::clone(&stage), true);
        let start = Instant::now();

        let outcome = seq.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Bypassed(BypassReason::ReducedMotion));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 0);
        assert_final_state(&stage);
        assert_eq!(seq.ambient().status(), SessionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_title_bypasses_with_roles() {
        let stage = Arc::new(Stage::complete());
        stage.detach(Role::Title);
        let (seq, launcher) = sequence(Arc::clone(&stage), false);

        let outcome = seq.run_or_reveal().await;
        assert_eq!(
            outcome,
            RunOutcome::Bypassed(BypassReason::MissingElements(vec![Role::Title]))
        );
        assert_eq!(outcome.label(), "bypassed");
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 0);
        assert!(stage.get(Role::Tagline).unwrap().style().is_at_rest());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_launch_still_plays() {
        let stage = Arc::new(Stage::complete());
        let (seq, launcher) = sequence(Arc::clone(&stage), false);

        let outcome = seq.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Played);
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 1);
        assert!(seq.particles().is_none());
        assert!(seq.ambient().is_running());
        assert_final_state(&stage);
        seq.stop_ambient();
    }

    #[test]
    fn stop_ambient_before_run_is_harmless() {
        let (seq, _) = sequence(Arc::new(Stage::complete()), false);
        seq.stop_ambient();
        seq.stop_ambient();
        assert_eq!(seq.ambient().status(), SessionStatus::Stopped);
    }

    #[test]
    fn bypass_reason_serializes_with_missing_roles() {
        let json =
            serde_json::to_value(BypassReason::MissingElements(vec![Role::Title])).unwrap();
        assert_eq!(json["reason"], "missing_elements");
        assert_eq!(json["missing"][0], "title");
    }
}
