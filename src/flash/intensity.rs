//! Flash intensity presets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stage::{Rgba, Tint};

/// Fixed wait after every flash and flicker before it resolves.
pub const SETTLE_BUFFER: Duration = Duration::from_millis(50);

/// Gradient laid over the lightning overlay for tinted flashes.
pub const LIGHTNING_TINT: Tint = Tint {
    angle_deg: 180.0,
    from: Rgba::new(200, 220, 255, 0.9),
    to: Rgba::new(120, 140, 255, 0.0),
};

/// Strength of a lightning flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    /// Faint ambient flash.
    Subtle,
    /// Mid-strength anticipation flash.
    Medium,
    /// The impact flash, tinted.
    Full,
}

/// What a flash of a given intensity looks like.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlashPreset {
    /// How long the overlay stays at peak.
    #[serde(with = "crate::config::duration_serde")]
    pub duration: Duration,
    /// Opacity at peak.
    pub peak_opacity: f32,
    /// Whether [`LIGHTNING_TINT`] is applied for the flash.
    pub tint: bool,
}

impl Intensity {
    /// All intensities, weakest first.
    pub const ALL: [Self; 3] = [Self::Subtle, Self::Medium, Self::Full];

    /// The preset for this intensity.
    #[must_use]
    pub const fn preset(self) -> FlashPreset {
        match self {
            Self::Subtle => FlashPreset {
                duration: Duration::from_millis(100),
                peak_opacity: 0.3,
                tint: false,
            },
            Self::Medium => FlashPreset {
                duration: Duration::from_millis(150),
                peak_opacity: 0.6,
                tint: false,
            },
            Self::Full => FlashPreset {
                duration: Duration::from_millis(200),
                peak_opacity: 1.0,
                tint: true,
            },
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subtle => "subtle",
            Self::Medium => "medium",
            Self::Full => "full",
        }
    }
}

impl std::fmt::Display for Intensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
