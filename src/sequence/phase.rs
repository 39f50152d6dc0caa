//! Choreography phases.

use std::time::Duration;

use serde::Serialize;

/// A named stage of the entrance choreography.
///
/// Phases run strictly in declaration order and never repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Pure wait before anything moves.
    Darkness,
    /// Rising tension: flickers, glitches, a medium flash.
    Anticipation,
    /// The single dramatic beat: title reveal plus five concurrent effects.
    Impact,
    /// Secondary reveals.
    Settle,
    /// Unbounded background loop.
    Ambient,
}

impl Phase {
    /// Every phase, in order.
    pub const ALL: [Self; 5] = [
        Self::Darkness,
        Self::Anticipation,
        Self::Impact,
        Self::Settle,
        Self::Ambient,
    ];

    /// Nominal duration; `None` for the unbounded ambient phase.
    #[must_use]
    pub const fn nominal(self) -> Option<Duration> {
        match self {
            Self::Darkness => Some(Duration::from_millis(800)),
            Self::Anticipation => Some(Duration::from_millis(1200)),
            Self::Impact => Some(Duration::from_millis(400)),
            Self::Settle => Some(Duration::from_millis(2000)),
            Self::Ambient => None,
        }
    }

    /// Zero-based position in [`Phase::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Darkness => "darkness",
            Self::Anticipation => "anticipation",
            Self::Impact => "impact",
            Self::Settle => "settle",
            Self::Ambient => "ambient",
        }
    }

    /// Sum of the bounded phases' nominal durations (4.4s).
    #[must_use]
    pub fn bounded_total() -> Duration {
        Self::ALL.iter().filter_map(|p| p.nominal()).sum()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
