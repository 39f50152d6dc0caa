//! Phase-based step scheduler.
//!
//! A [`Timeline`] is an ordered list of [`Step`]s. Each cue step is
//! anchored either to the end of everything still in flight
//! ([`Anchor::Sequential`]) or to the start of the step before it
//! ([`Anchor::WithPrevious`]), plus a delay. One loop ([`Timeline::play`])
//! interprets the list; the cues themselves are opaque and handed to a
//! [`CueRunner`].
//!
//! Phase boundaries are floors: entering the next phase first settles
//! every in-flight blocking step, then waits until the current phase's
//! nominal duration has elapsed since it began.

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

use crate::error::SequenceError;

use super::phase::Phase;

/// What a cue step's start is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// After every blocking step issued so far has resolved.
    Sequential,
    /// From the start of the immediately preceding step.
    WithPrevious,
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Sequential => "sequential",
            Self::WithPrevious => "with-previous",
        })
    }
}

/// One entry of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step<C> {
    /// Phase boundary.
    Enter {
        /// Phase being entered.
        phase: Phase,
    },
    /// Effect invocation.
    Cue {
        /// Start reference.
        anchor: Anchor,
        /// Extra delay after the anchor.
        #[serde(with = "crate::config::duration_serde")]
        delay: Duration,
        /// The cue itself.
        cue: C,
    },
}

/// Executes cues on behalf of [`Timeline::play`].
pub trait CueRunner<C>: Send + Sync {
    /// Called when a phase begins; `at` is the offset from timeline start.
    fn enter(&self, _phase: Phase, _previous: Option<Phase>, _at: Duration) {}

    /// Starts `cue`.
    ///
    /// Returning a future makes the cue blocking: it is spawned and later
    /// sequential steps wait for it. Returning `None` marks a
    /// fire-and-forget cue that has already done its work.
    fn issue(&self, cue: &C, phase: Phase, at: Duration) -> Option<BoxFuture<'static, ()>>;
}

/// Ordered list of phase boundaries and anchored cues.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Timeline<C> {
    steps: Vec<Step<C>>,
}

impl<C> Timeline<C> {
    /// Starts a timeline in `first`.
    #[must_use]
    pub fn new(first: Phase) -> Self {
        Self {
            steps: vec![Step::Enter { phase: first }],
        }
    }

    /// Appends a phase boundary.
    #[must_use]
    pub fn enter(mut self, phase: Phase) -> Self {
        self.steps.push(Step::Enter { phase });
        self
    }

    /// Appends a cue that starts `delay` after everything in flight settles.
    #[must_use]
    pub fn then(mut self, delay: Duration, cue: C) -> Self {
        self.steps.push(Step::Cue {
            anchor: Anchor::Sequential,
            delay,
            cue,
        });
        self
    }

    /// Appends a cue that starts `delay` after the previous step started.
    #[must_use]
    pub fn with_previous(mut self, delay: Duration, cue: C) -> Self {
        self.steps.push(Step::Cue {
            anchor: Anchor::WithPrevious,
            delay,
            cue,
        });
        self
    }

    /// All steps in order.
    #[must_use]
    pub fn steps(&self) -> &[Step<C>] {
        &self.steps
    }

    /// Phases in the order they are entered.
    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.steps.iter().filter_map(|s| match s {
            Step::Enter { phase } => Some(*phase),
            Step::Cue { .. } => None,
        })
    }

    /// Cues together with the phase they belong to.
    pub fn cues(&self) -> impl Iterator<Item = (Phase, Anchor, Duration, &C)> + '_ {
        let mut current = None;
        self.steps.iter().filter_map(move |s| match s {
            Step::Enter { phase } => {
                current = Some(*phase);
                None
            }
            Step::Cue { anchor, delay, cue } => current.map(|p| (p, *anchor, *delay, cue)),
        })
    }
}

impl<C: fmt::Display> Timeline<C> {
    /// Plays the timeline, resolving once every step has been issued and
    /// every blocking step has settled. Returns the elapsed time.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::StepFailed`] if a blocking cue's task
    /// panicked. Remaining steps are not issued.
    pub async fn play<R>(&self, runner: &R) -> Result<Duration, SequenceError>
    where
        R: CueRunner<C> + ?Sized,
    {
        let origin = Instant::now();
        let mut in_flight = InFlight::default();
        let mut current: Option<(Phase, Instant)> = None;
        let mut previous_start = origin;

        for step in &self.steps {
            match step {
                Step::Enter { phase } => {
                    settle(&mut in_flight).await?;
                    let floor = current.and_then(|(p, began)| p.nominal().map(|n| began + n));
                    if let Some(floor) = floor {
                        tokio::time::sleep_until(floor).await;
                    }
                    let now = Instant::now();
                    runner.enter(*phase, current.map(|(p, _)| p), now - origin);
                    current = Some((*phase, now));
                    previous_start = now;
                }
                Step::Cue { anchor, delay, cue } => {
                    let start = match anchor {
                        Anchor::Sequential => {
                            settle(&mut in_flight).await?;
                            tokio::time::sleep(*delay).await;
                            Instant::now()
                        }
                        Anchor::WithPrevious => {
                            let at = previous_start + *delay;
                            tokio::time::sleep_until(at).await;
                            at
                        }
                    };
                    previous_start = start;

                    let phase = current.map_or(Phase::Darkness, |(p, _)| p);
                    trace!(%phase, %anchor, %cue, "issuing cue");
                    if let Some(blocking) = runner.issue(cue, phase, start - origin) {
                        in_flight.0.push((cue.to_string(), tokio::spawn(blocking)));
                    }
                }
            }
        }

        settle(&mut in_flight).await?;
        Ok(origin.elapsed())
    }
}

/// Blocking steps spawned but not yet settled. Aborted if playback is
/// abandoned before they are awaited.
#[derive(Default)]
struct InFlight(Vec<(String, JoinHandle<()>)>);

impl Drop for InFlight {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

/// Waits for every in-flight blocking step, in issue order.
async fn settle(in_flight: &mut InFlight) -> Result<(), SequenceError> {
    let mut result = Ok(());
    for (cue, handle) in in_flight.0.drain(..) {
        if let Err(source) = handle.await {
            if result.is_ok() {
                result = Err(SequenceError::StepFailed { cue, source });
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Probe {
        Block(u64),
        Mark,
        Panic,
        Late(u64),
    }

    impl fmt::Display for Probe {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<(String, u128)>>,
        late: Arc<AtomicBool>,
    }

    impl Recorder {
        fn log(&self) -> Vec<(String, u128)> {
            self.log.lock().unwrap().clone()
        }
    }

    impl CueRunner<Probe> for Recorder {
        fn enter(&self, phase: Phase, _previous: Option<Phase>, at: Duration) {
            self.log.lock().unwrap().push((phase.to_string(), at.as_millis()));
        }

        fn issue(
            &self,
            cue: &Probe,
            _phase: Phase,
            at: Duration,
        ) -> Option<BoxFuture<'static, ()>> {
            self.log.lock().unwrap().push((cue.to_string(), at.as_millis()));
            match *cue {
                Probe::Block(ms) => {
                    Some(Box::pin(tokio::time::sleep(Duration::from_millis(ms))))
                }
                Probe::Mark => None,
                Probe::Panic => Some(Box::pin(explode())),
                Probe::Late(ms) => {
                    let late = Arc::clone(&self.late);
                    Some(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        late.store(true, Ordering::SeqCst);
                    }))
                }
            }
        }
    }

    async fn explode() {
        panic!("cue exploded");
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_waits_for_blocking_steps() {
        let timeline = Timeline::new(Phase::Anticipation)
            .then(ms(0), Probe::Block(300))
            .then(ms(200), Probe::Mark)
            .then(ms(100), Probe::Mark);
        let recorder = Recorder::default();
        timeline.play(&recorder).await.unwrap();

        let at: Vec<u128> = recorder.log().into_iter().map(|(_, t)| t).collect();
        assert_eq!(at, vec![0, 0, 500, 600]);
    }

    #[tokio::test(start_paused = true)]
    async fn with_previous_shares_the_start_instant() {
        let timeline = Timeline::new(Phase::Impact)
            .then(ms(50), Probe::Block(400))
            .with_previous(ms(0), Probe::Block(100))
            .with_previous(ms(0), Probe::Mark)
            .with_previous(ms(10), Probe::Mark);
        let recorder = Recorder::default();
        let elapsed = timeline.play(&recorder).await.unwrap();

        let at: Vec<u128> = recorder.log().into_iter().map(|(_, t)| t).collect();
        assert_eq!(at, vec![0, 50, 50, 50, 60]);
        assert_eq!(elapsed, ms(450));
    }

    #[tokio::test(start_paused = true)]
    async fn phase_floor_holds_short_phases() {
        let timeline = Timeline::new(Phase::Darkness)
            .enter(Phase::Anticipation)
            .then(ms(0), Probe::Block(100))
            .enter(Phase::Impact);
        let recorder = Recorder::default();
        timeline.play(&recorder).await.unwrap();

        assert_eq!(
            recorder.log(),
            vec![
                ("darkness".to_string(), 0),
                ("anticipation".to_string(), 800),
                ("Block(100)".to_string(), 800),
                ("impact".to_string(), 2000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_phase_pushes_the_next_one() {
        let timeline = Timeline::new(Phase::Impact)
            .then(ms(0), Probe::Block(700))
            .enter(Phase::Settle);
        let recorder = Recorder::default();
        timeline.play(&recorder).await.unwrap();
        assert_eq!(recorder.log().last().unwrap(), &("settle".to_string(), 700));
    }

    #[tokio::test(start_paused = true)]
    async fn fire_and_forget_does_not_block() {
        let timeline = Timeline::new(Phase::Ambient)
            .then(ms(0), Probe::Mark)
            .then(ms(0), Probe::Mark);
        let elapsed = timeline.play(&Recorder::default()).await.unwrap();
        assert_eq!(elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_step_surfaces_as_step_failed() {
        let timeline = Timeline::new(Phase::Settle)
            .then(ms(0), Probe::Panic)
            .then(ms(0), Probe::Mark);
        let recorder = Recorder::default();
        let err = timeline.play(&recorder).await.unwrap_err();

        let SequenceError::StepFailed { cue, source } = err else {
            panic!("expected a failed step, got {err}");
        };
        assert_eq!(cue, "Panic");
        assert!(source.is_panic());
        // the step after the failure is never issued
        assert_eq!(recorder.log().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_playback_aborts_blocking_steps() {
        let timeline = Timeline::new(Phase::Anticipation).then(ms(0), Probe::Late(500));
        let recorder = Recorder::default();

        let abandoned = tokio::time::timeout(ms(100), timeline.play(&recorder)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(ms(1_000)).await;
        assert!(!recorder.late.load(Ordering::SeqCst));
    }

    #[test]
    fn cues_are_grouped_by_phase() {
        let timeline = Timeline::new(Phase::Darkness)
            .enter(Phase::Anticipation)
            .then(ms(200), Probe::Mark)
            .enter(Phase::Impact)
            .with_previous(ms(0), Probe::Mark);
        let cues: Vec<_> = timeline.cues().map(|(p, a, d, _)| (p, a, d)).collect();
        assert_eq!(
            cues,
            vec![
                (Phase::Anticipation, Anchor::Sequential, ms(200)),
                (Phase::Impact, Anchor::WithPrevious, ms(0)),
            ]
        );
        assert_eq!(timeline.phases().count(), 3);
    }

    #[test]
    fn steps_serialize_with_tags() {
        let timeline = Timeline::new(Phase::Impact).with_previous(ms(0), "flash");
        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json[0]["step"], "enter");
        assert_eq!(json[0]["phase"], "impact");
        assert_eq!(json[1]["anchor"], "with_previous");
        assert_eq!(json[1]["delay"], "0ms");
        assert_eq!(json[1]["cue"], "flash");
    }
}
