//! Flash effect engine.
//!
//! Animates the visibility and tint of a single overlay element. The
//! engine holds no per-call state: it only carries the reduced-motion
//! signal and the chance source its patterns roll against.
//!
//! # Architecture
//!
//! - [`Intensity`] — fixed `(duration, peak opacity, tint)` presets
//! - [`pulse`] — flash and flicker patterns as [`Pulse`] data, one player loop
//! - [`FlashEngine`] — `flash` / `flicker` entry points
//! - [`AmbientLoop`] — the endless, stoppable background flash loop

pub mod ambient;
pub mod intensity;
pub mod pulse;

use std::sync::Arc;

use tracing::trace;

use crate::chance::Chance;
use crate::motion::MotionQuery;
use crate::stage::Element;

pub use ambient::{AmbientLoop, AmbientTiming};
pub use intensity::{FlashPreset, Intensity, LIGHTNING_TINT, SETTLE_BUFFER};
pub use pulse::Pulse;

/// Stateless flash/flicker driver.
#[derive(Clone)]
pub struct FlashEngine {
    motion: Arc<dyn MotionQuery>,
    chance: Arc<dyn Chance>,
}

impl FlashEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(motion: Arc<dyn MotionQuery>, chance: Arc<dyn Chance>) -> Self {
        Self { motion, chance }
    }

    /// The chance source patterns roll against.
    #[must_use]
    pub fn chance(&self) -> &Arc<dyn Chance> {
        &self.chance
    }

    /// Whether effects are currently suppressed.
    #[must_use]
    pub fn motion_reduced(&self) -> bool {
        self.motion.prefers_reduced_motion()
    }

    /// Single flash: peak, hold, dark, settle.
    ///
    /// Resolves after `preset.duration + SETTLE_BUFFER`, leaving the overlay
    /// at opacity 0 with no tint. Resolves immediately, touching nothing,
    /// when motion is reduced.
    pub async fn flash(&self, overlay: &dyn Element, intensity: Intensity) {
        if self.motion_reduced() {
            return;
        }

        let preset = intensity.preset();
        trace!(%intensity, "flash");
        if preset.tint {
            overlay.set_tint(Some(LIGHTNING_TINT));
        }

        let pattern = pulse::flash_pattern(preset);
        pulse::play(overlay, &pattern, |index, _| {
            if index == 1 && preset.tint {
                overlay.set_tint(None);
            }
        })
        .await;
    }

    /// Irregular two-or-three strike flicker.
    ///
    /// Resolves after 280ms, or 350ms when the faint third pulse is rolled,
    /// leaving the overlay at opacity 0. Resolves immediately when motion is
    /// reduced.
    pub async fn flicker(&self, overlay: &dyn Element) {
        if self.motion_reduced() {
            return;
        }

        let pattern = pulse::flicker_pattern(self.chance.as_ref());
        trace!(pulses = pattern.len(), "flicker");
        pulse::play(overlay, &pattern, |_, _| {}).await;
    }
}

impl std::fmt::Debug for FlashEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashEngine")
            .field("motion_reduced", &self.motion_reduced())
            .finish_non_exhaustive()
    }
}
