//! Eased style transitions.
//!
//! A [`Transition`] interpolates opacity, scale, vertical offset and blur
//! between two [`StyleFrame`]s, writing one frame per `frame` interval and
//! landing exactly on the target values when the duration has elapsed.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};

use crate::stage::{Element, ElementStyle};

/// Default frame interval (~60 fps).
pub const DEFAULT_FRAME: Duration = Duration::from_millis(16);

/// Back-out overshoot constant (the classic 1.70158).
const BACK_OVERSHOOT: f64 = 1.701_58;

/// Easing curve applied to normalized progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ease {
    /// Constant speed.
    Linear,
    /// Fast start, decelerating (cubic).
    #[default]
    CubicOut,
    /// Overshoots the target slightly before settling.
    BackOut,
}

impl Ease {
    /// Maps progress `t` in `[0, 1]` to eased progress.
    ///
    /// `BackOut` exceeds 1.0 mid-curve; every curve returns exactly 0.0 at
    /// `t = 0` and 1.0 at `t = 1`.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::CubicOut => {
                let t1 = t - 1.0;
                (t1 * t1).mul_add(t1, 1.0)
            }
            Self::BackOut => {
                let c1 = BACK_OVERSHOOT;
                let c3 = c1 + 1.0;
                let t1 = t - 1.0;
                c3 * t1.powi(3) + c1 * t1.powi(2) + 1.0
            }
        }
    }
}

/// The animatable subset of an element's style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StyleFrame {
    /// Opacity.
    pub opacity: f32,
    /// Uniform scale.
    pub scale: f32,
    /// Vertical offset in pixels.
    pub translate_y: f32,
    /// Blur radius in pixels.
    pub blur_px: f32,
}

impl StyleFrame {
    /// Fully revealed, untransformed.
    pub const REST: Self = Self {
        opacity: 1.0,
        scale: 1.0,
        translate_y: 0.0,
        blur_px: 0.0,
    };

    /// Linear interpolation between two frames at eased progress `k`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn lerp(self, to: Self, k: f64) -> Self {
        let mix = |a: f32, b: f32| (f64::from(b) - f64::from(a)).mul_add(k, f64::from(a)) as f32;
        Self {
            opacity: mix(self.opacity, to.opacity),
            scale: mix(self.scale, to.scale),
            translate_y: mix(self.translate_y, to.translate_y),
            blur_px: mix(self.blur_px, to.blur_px),
        }
    }

    /// Writes this frame onto an element.
    pub fn apply_to(self, element: &dyn Element) {
        element.update(&mut |s: &mut ElementStyle| {
            s.opacity = self.opacity.clamp(0.0, 1.0);
            s.scale = self.scale;
            s.translate_y = self.translate_y;
            s.blur_px = self.blur_px.max(0.0);
        });
    }
}

/// A timed, eased change from one frame to another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transition {
    /// Starting frame, applied immediately.
    pub from: StyleFrame,
    /// Final frame, applied exactly at the end.
    pub to: StyleFrame,
    /// Total duration.
    #[serde(with = "crate::config::duration_serde")]
    pub duration: Duration,
    /// Easing curve.
    pub ease: Ease,
}

impl Transition {
    /// Plays the transition on `element`, resolving once `to` is applied.
    pub async fn play(&self, element: &dyn Element, frame: Duration) {
        if self.duration.is_zero() {
            self.to.apply_to(element);
            return;
        }

        let start = Instant::now();
        let mut ticker = tokio::time::interval(frame.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let end = tokio::time::sleep_until(start + self.duration);
        tokio::pin!(end);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = &mut end => break,
            }
            let elapsed = start.elapsed();
            if elapsed >= self.duration {
                break;
            }
            let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
            self.from.lerp(self.to, self.ease.apply(t)).apply_to(element);
        }

        self.to.apply_to(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{Role, StyleNode};

    #[test]
    fn curves_hit_endpoints() {
        for ease in [Ease::Linear, Ease::CubicOut, Ease::BackOut] {
            assert!(ease.apply(0.0).abs() < 1e-9, "{ease:?} at 0");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-9, "{ease:?} at 1");
        }
    }

    #[test]
    fn cubic_out_front_loads_progress() {
        assert!(Ease::CubicOut.apply(0.5) > 0.5);
        assert!((Ease::Linear.apply(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn back_out_overshoots() {
        let peak = (1..100)
            .map(|i| Ease::BackOut.apply(f64::from(i) / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn progress_is_clamped() {
        assert!((Ease::CubicOut.apply(3.0) - 1.0).abs() < 1e-9);
        assert!(Ease::CubicOut.apply(-1.0).abs() < 1e-9);
    }

    #[test]
    fn lerp_midpoint() {
        let from = StyleFrame {
            opacity: 0.0,
            scale: 1.5,
            translate_y: 0.0,
            blur_px: 20.0,
        };
        let mid = from.lerp(StyleFrame::REST, 0.5);
        assert!((mid.opacity - 0.5).abs() < 1e-6);
        assert!((mid.scale - 1.25).abs() < 1e-6);
        assert!((mid.blur_px - 10.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn transition_lands_on_target_after_duration() {
        let node = StyleNode::new(Some(Role::Title));
        let transition = Transition {
            from: StyleFrame {
                opacity: 0.0,
                scale: 1.5,
                translate_y: 0.0,
                blur_px: 20.0,
            },
            to: StyleFrame::REST,
            duration: Duration::from_millis(400),
            ease: Ease::CubicOut,
        };

        let start = Instant::now();
        transition.play(&node, DEFAULT_FRAME).await;

        assert_eq!(start.elapsed(), Duration::from_millis(400));
        assert!(node.style().is_at_rest());
    }

    #[tokio::test(start_paused = true)]
    async fn duration_off_the_frame_grid_is_not_rounded_up() {
        let node = StyleNode::new(Some(Role::ComingSoon));
        let transition = Transition {
            from: StyleFrame {
                opacity: 0.0,
                scale: 0.8,
                ..StyleFrame::REST
            },
            to: StyleFrame::REST,
            duration: Duration::from_millis(500),
            ease: Ease::BackOut,
        };

        let start = Instant::now();
        transition.play(&node, DEFAULT_FRAME).await;

        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert!(node.style().is_at_rest());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_applies_target_immediately() {
        let node = StyleNode::new(Some(Role::Tagline));
        node.set_opacity(0.0);
        let transition = Transition {
            from: StyleFrame {
                opacity: 0.0,
                ..StyleFrame::REST
            },
            to: StyleFrame::REST,
            duration: Duration::ZERO,
            ease: Ease::Linear,
        };
        let start = Instant::now();
        transition.play(&node, DEFAULT_FRAME).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(node.style().is_at_rest());
    }
}
