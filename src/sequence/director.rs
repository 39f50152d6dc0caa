//! Executes entrance cues against the resolved cast.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::flash::{AmbientTiming, FlashEngine};
use crate::motion::MotionQuery;
use crate::observability::{Event, EventEmitter, metrics};
use crate::particles::{self, ParticleSystem};
use crate::stage::Element;

use super::ambient::AmbientSession;
use super::choreography::Cue;
use super::cues::{
    self, BURST_CLASS, BURST_HOLD, GLITCH_CLASS, PULSE_CLASS, SHAKE_CLASS, SLASH_CLASS,
    SLASH_HOLD, SLASH_REVERSE_CLASS,
};
use super::phase::Phase;
use super::reveal::{self, Cast};
use super::timeline::CueRunner;

/// Everything a single run's cues act on.
pub struct Director {
    pub(crate) cast: Cast,
    pub(crate) engine: FlashEngine,
    pub(crate) motion: Arc<dyn MotionQuery>,
    pub(crate) particles: Option<Arc<dyn ParticleSystem>>,
    pub(crate) session: AmbientSession,
    pub(crate) ambient_timing: AmbientTiming,
    pub(crate) frame: Duration,
    pub(crate) events: Arc<EventEmitter>,
    pub(crate) cancel: CancellationToken,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Director {
    fn glitch(&self, hold: Duration) {
        cues::pulse_class(
            Arc::clone(&self.cast.title),
            GLITCH_CLASS,
            hold,
            self.cancel.clone(),
        );
    }

    /// Pulses `class` on an optional element; returns whether it was absent.
    fn pulse_optional(
        &self,
        element: Option<&Arc<dyn Element>>,
        class: &'static str,
        hold: Duration,
    ) -> bool {
        element.map_or(true, |el| {
            cues::pulse_class(Arc::clone(el), class, hold, self.cancel.clone());
            false
        })
    }
}

impl CueRunner<Cue> for Director {
    fn enter(&self, phase: Phase, previous: Option<Phase>, at: Duration) {
        info!(%phase, at_ms = millis(at), "phase entered");
        metrics::record_phase(phase.as_str(), previous.map(Phase::as_str));
        self.events.emit(Event::PhaseEntered {
            timestamp: Utc::now(),
            phase: phase.to_string(),
            phase_index: phase.index(),
            at_ms: millis(at),
        });
    }

    fn issue(&self, cue: &Cue, phase: Phase, at: Duration) -> Option<BoxFuture<'static, ()>> {
        let mut skipped = false;
        let frame = self.frame;

        let blocking: Option<BoxFuture<'static, ()>> = match *cue {
            Cue::SpeedUpParticles => {
                skipped = self.particles.is_none();
                particles::speed_up(self.particles.as_deref());
                None
            }
            Cue::SlowDownParticles => {
                skipped = self.particles.is_none();
                particles::slow_down(self.particles.as_deref());
                None
            }
            Cue::Flicker => {
                let engine = self.engine.clone();
                let overlay = Arc::clone(&self.cast.lightning);
                Some(Box::pin(async move { engine.flicker(overlay.as_ref()).await }))
            }
            Cue::Flash { intensity } => {
                let engine = self.engine.clone();
                let overlay = Arc::clone(&self.cast.lightning);
                Some(Box::pin(async move {
                    engine.flash(overlay.as_ref(), intensity).await;
                }))
            }
            Cue::Glitch { hold } => {
                self.glitch(hold);
                None
            }
            Cue::RevealTitle => {
                let title = Arc::clone(&self.cast.title);
                let transition = reveal::title_reveal();
                Some(Box::pin(async move {
                    transition.play(title.as_ref(), frame).await;
                }))
            }
            Cue::Slash { reverse } => {
                let class = if reverse { SLASH_REVERSE_CLASS } else { SLASH_CLASS };
                skipped = self.pulse_optional(self.cast.slash_line.as_ref(), class, SLASH_HOLD);
                None
            }
            Cue::Burst => {
                skipped = self.pulse_optional(self.cast.burst.as_ref(), BURST_CLASS, BURST_HOLD);
                None
            }
            Cue::Shake { hold } => {
                cues::pulse_class(
                    Arc::clone(&self.cast.page),
                    SHAKE_CLASS,
                    hold,
                    self.cancel.clone(),
                );
                None
            }
            Cue::PulseTitle => {
                self.cast.title.add_class(PULSE_CLASS);
                None
            }
            Cue::RevealTagline => Some(Box::pin(reveal::reveal_and_mark(
                Arc::clone(&self.cast.tagline),
                reveal::tagline_reveal(),
                frame,
            ))),
            Cue::RevealComingSoon => Some(Box::pin(reveal::reveal_and_mark(
                Arc::clone(&self.cast.coming_soon),
                reveal::coming_soon_reveal(),
                frame,
            ))),
            Cue::DeferredGlitch { after, hold } => {
                let title = Arc::clone(&self.cast.title);
                let cancel = self.cancel.clone();
                cues::deferred(after, self.cancel.clone(), move || {
                    cues::pulse_class(title, GLITCH_CLASS, hold, cancel);
                });
                None
            }
            Cue::StartAmbient => {
                skipped = !self.session.start(
                    self.engine.clone(),
                    Arc::clone(&self.motion),
                    self.ambient_timing,
                );
                None
            }
        };

        debug!(%phase, %cue, at_ms = millis(at), skipped, "cue issued");
        metrics::record_cue(cue.label(), skipped);
        self.events.emit(Event::CueIssued {
            timestamp: Utc::now(),
            phase: phase.to_string(),
            cue: cue.to_string(),
            at_ms: millis(at),
            skipped,
        });

        blocking
    }
}
