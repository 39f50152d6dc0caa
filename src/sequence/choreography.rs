//! The entrance choreography as data.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::duration_serde;
use crate::flash::Intensity;

use super::phase::Phase;
use super::timeline::Timeline;

/// One effect invocation in the entrance timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Cue {
    /// Multiply particle velocity and density.
    SpeedUpParticles,
    /// Undo [`Cue::SpeedUpParticles`].
    SlowDownParticles,
    /// Irregular lightning flicker (blocking).
    Flicker,
    /// Single lightning flash (blocking).
    Flash {
        /// Preset to use.
        intensity: Intensity,
    },
    /// Glitch pulse on the title.
    Glitch {
        /// How long the glitch class stays on.
        #[serde(with = "duration_serde")]
        hold: Duration,
    },
    /// The title's unblur/scale-in (blocking).
    RevealTitle,
    /// Slash-line sweep.
    Slash {
        /// The second, differently angled sweep.
        reverse: bool,
    },
    /// Burst-overlay reveal.
    Burst,
    /// Whole-page shake.
    Shake {
        /// How long the shake class stays on.
        #[serde(with = "duration_serde")]
        hold: Duration,
    },
    /// Start the title's looping pulse.
    PulseTitle,
    /// Tagline fade-up, then `revealed` (blocking).
    RevealTagline,
    /// Coming-soon scale-in, then `revealed` (blocking).
    RevealComingSoon,
    /// Glitch scheduled for later; never waited on.
    DeferredGlitch {
        /// Wait before the glitch.
        #[serde(with = "duration_serde")]
        after: Duration,
        /// How long the glitch class stays on.
        #[serde(with = "duration_serde")]
        hold: Duration,
    },
    /// Start the ambient session.
    StartAmbient,
}

impl Cue {
    /// Stable label, also used as the metrics label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SpeedUpParticles => "speed-up-particles",
            Self::SlowDownParticles => "slow-down-particles",
            Self::Flicker => "flicker",
            Self::Flash { .. } => "flash",
            Self::Glitch { .. } => "glitch",
            Self::RevealTitle => "reveal-title",
            Self::Slash { reverse: false } => "slash",
            Self::Slash { reverse: true } => "slash-reverse",
            Self::Burst => "burst",
            Self::Shake { .. } => "shake",
            Self::PulseTitle => "pulse-title",
            Self::RevealTagline => "reveal-tagline",
            Self::RevealComingSoon => "reveal-coming-soon",
            Self::DeferredGlitch { .. } => "deferred-glitch",
            Self::StartAmbient => "start-ambient",
        }
    }

    /// Whether the timeline waits for this cue before sequential steps.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(
            self,
            Self::Flicker
                | Self::Flash { .. }
                | Self::RevealTitle
                | Self::RevealTagline
                | Self::RevealComingSoon
        )
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flash { intensity } => write!(f, "flash({intensity})"),
            Self::Glitch { hold } | Self::Shake { hold } => {
                write!(f, "{}({}ms)", self.label(), hold.as_millis())
            }
            Self::DeferredGlitch { after, hold } => write!(
                f,
                "deferred-glitch({}ms after {}ms)",
                hold.as_millis(),
                after.as_millis()
            ),
            _ => f.write_str(self.label()),
        }
    }
}

const fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// The fixed entrance choreography.
///
/// darkness → anticipation (speed-up, flicker, glitch, medium flash,
/// glitch, flicker) → impact (title reveal with five effects at the same
/// instant) → settle (slow-down, pulse, reverse slash, tagline,
/// coming-soon, deferred glitch) → ambient.
#[must_use]
pub fn entrance_timeline() -> Timeline<Cue> {
    Timeline::new(Phase::Darkness)
        .enter(Phase::Anticipation)
        .then(ms(0), Cue::SpeedUpParticles)
        .then(ms(200), Cue::Flicker)
        .then(ms(300), Cue::Glitch { hold: ms(150) })
        .then(
            ms(200),
            Cue::Flash {
                intensity: Intensity::Medium,
            },
        )
        .then(ms(100), Cue::Glitch { hold: ms(100) })
        .then(ms(200), Cue::Flicker)
        .enter(Phase::Impact)
        .then(ms(0), Cue::RevealTitle)
        .with_previous(
            ms(0),
            Cue::Flash {
                intensity: Intensity::Full,
            },
        )
        .with_previous(ms(0), Cue::Slash { reverse: false })
        .with_previous(ms(0), Cue::Burst)
        .with_previous(ms(0), Cue::Shake { hold: ms(500) })
        .with_previous(ms(0), Cue::Glitch { hold: ms(200) })
        .enter(Phase::Settle)
        .then(ms(0), Cue::SlowDownParticles)
        .then(ms(0), Cue::PulseTitle)
        .then(ms(300), Cue::Slash { reverse: true })
        .then(ms(200), Cue::RevealTagline)
        .then(ms(300), Cue::RevealComingSoon)
        .then(
            ms(0),
            Cue::DeferredGlitch {
                after: ms(2000),
                hold: ms(100),
            },
        )
        .enter(Phase::Ambient)
        .then(ms(0), Cue::StartAmbient)
}
