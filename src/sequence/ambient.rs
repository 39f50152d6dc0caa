//! Ambient session: the unbounded tail of the choreography.
//!
//! A session bundles the lightning flash loop and the title's glitch
//! texture behind one cancellation token. It is created idle alongside
//! the sequence, started at most once when settle is over, and stopped by
//! the host. The handle is cheap to clone; every clone controls the same
//! session.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::chance::Chance;
use crate::flash::{self, AmbientLoop, AmbientTiming, FlashEngine};
use crate::motion::MotionQuery;
use crate::observability::{Event, EventEmitter};
use crate::stage::{Element, Role, Stage};

use super::cues::GLITCH_CLASS;

/// Period of the title glitch texture.
pub const TEXTURE_PERIOD: Duration = Duration::from_secs(5);
/// Chance of a glitch on each texture tick.
pub const TEXTURE_CHANCE: f64 = 0.3;
/// How long a texture glitch stays on.
pub const TEXTURE_HOLD: Duration = Duration::from_millis(80);

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, not yet started.
    Idle,
    /// Flash loop and texture are running.
    Running,
    /// Stopped; never restarts.
    Stopped,
}

enum State {
    Idle,
    Running {
        flash: AmbientLoop,
        texture: JoinHandle<()>,
    },
    Stopped,
}

impl State {
    const fn status(&self) -> SessionStatus {
        match self {
            Self::Idle => SessionStatus::Idle,
            Self::Running { .. } => SessionStatus::Running,
            Self::Stopped => SessionStatus::Stopped,
        }
    }
}

struct Inner {
    stage: Arc<Stage>,
    events: Arc<EventEmitter>,
    cancel: CancellationToken,
    state: Mutex<State>,
}

/// Handle to the ambient session of one sequence.
#[derive(Clone)]
pub struct AmbientSession {
    inner: Arc<Inner>,
}

impl AmbientSession {
    /// Creates an idle session over `stage`.
    #[must_use]
    pub fn new(stage: Arc<Stage>, events: Arc<EventEmitter>) -> Self {
        Self {
            inner: Arc::new(Inner {
                stage,
                events,
                cancel: CancellationToken::new(),
                state: Mutex::new(State::Idle),
            }),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.lock().status()
    }

    /// Whether the session is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    /// Token cancelled when the session stops.
    ///
    /// Deferred effects of the sequence hang off child tokens so stopping
    /// the session also tears them down.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Starts the flash loop on the lightning overlay and the glitch
    /// texture on the title.
    ///
    /// Returns `false` without doing anything if the session is not idle
    /// or either element is absent.
    pub fn start(
        &self,
        engine: FlashEngine,
        motion: Arc<dyn MotionQuery>,
        timing: AmbientTiming,
    ) -> bool {
        let mut state = self.lock();
        if !matches!(*state, State::Idle) {
            debug!(status = ?state.status(), "ambient session not idle; start ignored");
            return false;
        }
        let (Some(overlay), Some(title)) = (
            self.inner.stage.get(Role::Lightning),
            self.inner.stage.get(Role::Title),
        ) else {
            debug!("ambient session has no overlay or title; start ignored");
            return false;
        };

        let chance = Arc::clone(engine.chance());
        let flash = AmbientLoop::start(engine, overlay, timing);
        let texture = tokio::spawn(glitch_texture(
            title,
            chance,
            motion,
            self.inner.cancel.child_token(),
        ));
        *state = State::Running { flash, texture };
        drop(state);

        info!("ambient session started");
        self.inner.events.emit(Event::AmbientStarted {
            timestamp: Utc::now(),
        });
        true
    }

    /// Stops the session: halts scheduling, cancels every pending timer
    /// and resets the lightning overlay to invisible and untinted.
    ///
    /// Safe to call at any time, any number of times, including before
    /// [`start`](Self::start); a stopped session never starts.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock(), State::Stopped);
        self.inner.cancel.cancel();

        if let State::Running { flash, texture } = previous {
            flash.stop();
            texture.abort();
            info!("ambient session stopped");
            self.inner.events.emit(Event::AmbientStopped {
                timestamp: Utc::now(),
            });
        }

        if let Some(overlay) = self.inner.stage.get(Role::Lightning) {
            flash::ambient::reset(overlay.as_ref());
        }
        if let Some(title) = self.inner.stage.get(Role::Title) {
            title.remove_class(GLITCH_CLASS);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AmbientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientSession")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Every [`TEXTURE_PERIOD`], with [`TEXTURE_CHANCE`], glitch the title for
/// [`TEXTURE_HOLD`].
async fn glitch_texture(
    title: Arc<dyn Element>,
    chance: Arc<dyn Chance>,
    motion: Arc<dyn MotionQuery>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + TEXTURE_PERIOD, TEXTURE_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if motion.prefers_reduced_motion() || !chance.hit(TEXTURE_CHANCE) {
            continue;
        }

        trace!("texture glitch");
        title.add_class(GLITCH_CLASS);
        let cancelled = tokio::select! {
            () = cancel.cancelled() => true,
            () = tokio::time::sleep(TEXTURE_HOLD) => false,
        };
        title.remove_class(GLITCH_CLASS);
        if cancelled {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::ScriptedChance;
    use crate::flash::LIGHTNING_TINT;
    use crate::motion::MotionSetting;

    struct Fixture {
        stage: Arc<Stage>,
        session: AmbientSession,
        engine: FlashEngine,
        motion: Arc<dyn MotionQuery>,
    }

    fn fixture(samples: Vec<f64>, fallback: f64) -> Fixture {
        let stage = Arc::new(Stage::complete());
        let motion: Arc<dyn MotionQuery> = Arc::new(MotionSetting::new(false));
        let engine = FlashEngine::new(
            Arc::clone(&motion),
            Arc::new(ScriptedChance::new(samples, fallback)),
        );
        Fixture {
            session: AmbientSession::new(Arc::clone(&stage), Arc::new(EventEmitter::noop())),
            stage,
            engine,
            motion,
        }
    }

    impl Fixture {
        fn start(&self) -> bool {
            self.session.start(
                self.engine.clone(),
                Arc::clone(&self.motion),
                AmbientTiming::default(),
            )
        }
    }

    fn overlay_is_clean(stage: &Stage) -> bool {
        let style = stage.get(Role::Lightning).unwrap().style();
        style.opacity.abs() < f32::EPSILON && style.tint.is_none()
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_start_is_clean_and_final() {
        let f = fixture(vec![], 0.99);
        let overlay = f.stage.get(Role::Lightning).unwrap();
        overlay.set_opacity(0.7);
        overlay.set_tint(Some(LIGHTNING_TINT));

        f.session.stop();
        assert_eq!(f.session.status(), SessionStatus::Stopped);
        assert!(overlay_is_clean(&f.stage));

        assert!(!f.start());
        assert!(!f.session.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_twice_is_harmless() {
        let f = fixture(vec![], 0.99);
        assert!(f.start());
        assert!(f.session.is_running());
        f.session.stop();
        f.session.stop();
        assert_eq!(f.session.status(), SessionStatus::Stopped);
        assert!(overlay_is_clean(&f.stage));
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_ignored() {
        let f = fixture(vec![], 0.99);
        assert!(f.start());
        assert!(!f.start());
        f.session.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn texture_glitches_on_a_hit_and_stop_cancels_it() {
        // ambient wait draws 0.99 (≈12s), texture tick at 5s draws 0.1 (hit)
        let f = fixture(vec![0.99, 0.1], 0.99);
        let title = f.stage.get(Role::Title).unwrap();
        assert!(f.start());

        tokio::time::sleep(Duration::from_millis(5_040)).await;
        assert!(title.has_class(GLITCH_CLASS));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!title.has_class(GLITCH_CLASS));

        f.session.stop();
        // Nothing else happens once stopped, not even at the 12s flash.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!title.has_class(GLITCH_CLASS));
        assert!(overlay_is_clean(&f.stage));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_child_tokens() {
        let f = fixture(vec![], 0.99);
        let child = f.session.token().child_token();
        f.session.stop();
        assert!(child.is_cancelled());
    }
}
