//! Flash patterns as data.
//!
//! A pattern is a list of [`Pulse`]s: set the overlay to an opacity, hold
//! it for a while, move on. One loop ([`play`]) drives every pattern.

use std::time::Duration;

use crate::chance::Chance;
use crate::stage::Element;

use super::intensity::{FlashPreset, SETTLE_BUFFER};

/// Probability that a flicker gets its third, faint pulse.
pub const FAINT_PULSE_CHANCE: f64 = 0.5;

/// One step of an overlay pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    /// Opacity applied at the start of the step.
    pub opacity: f32,
    /// How long the step lasts.
    pub hold: Duration,
}

impl Pulse {
    /// Creates a pulse.
    #[must_use]
    pub const fn new(opacity: f32, hold_ms: u64) -> Self {
        Self {
            opacity,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

/// Two irregular strikes: bright, dark, brighter, dark.
const FLICKER_STRIKES: [Pulse; 4] = [
    Pulse::new(0.5, 40),
    Pulse::new(0.0, 60),
    Pulse::new(0.7, 50),
    Pulse::new(0.0, 80),
];

/// The optional faint afterglow: a short gap, then a dim strike.
const FLICKER_AFTERGLOW: [Pulse; 2] = [Pulse::new(0.0, 40), Pulse::new(0.3, 30)];

/// Builds a flicker pattern, rolling once for the faint third pulse.
#[must_use]
pub fn flicker_pattern(chance: &dyn Chance) -> Vec<Pulse> {
    let mut pulses = FLICKER_STRIKES.to_vec();
    if chance.hit(FAINT_PULSE_CHANCE) {
        pulses.extend_from_slice(&FLICKER_AFTERGLOW);
    }
    pulses.push(Pulse {
        opacity: 0.0,
        hold: SETTLE_BUFFER,
    });
    pulses
}

/// Builds the two-step pattern of a single flash.
#[must_use]
pub fn flash_pattern(preset: FlashPreset) -> [Pulse; 2] {
    [
        Pulse {
            opacity: preset.peak_opacity,
            hold: preset.duration,
        },
        Pulse {
            opacity: 0.0,
            hold: SETTLE_BUFFER,
        },
    ]
}

/// Sum of all holds in a pattern.
#[must_use]
pub fn total(pulses: &[Pulse]) -> Duration {
    pulses.iter().map(|p| p.hold).sum()
}

/// Plays a pattern on `overlay`.
///
/// `on_step` runs after each opacity write, before the hold; flashes use it
/// to drop the tint as soon as the overlay goes dark.
pub async fn play(
    overlay: &dyn Element,
    pulses: &[Pulse],
    mut on_step: impl FnMut(usize, &Pulse),
) {
    for (index, pulse) in pulses.iter().enumerate() {
        overlay.set_opacity(pulse.opacity);
        on_step(index, pulse);
        tokio::time::sleep(pulse.hold).await;
    }
}
