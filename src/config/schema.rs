//! Typed run configuration and its validation rules.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Severity, ValidationIssue};
use crate::flash::AmbientTiming;
use crate::motion::MotionPreference;
use crate::particles::DriftConfig;
use crate::stage::Role;
use crate::tween::DEFAULT_FRAME;

use super::duration_serde;

/// Upper bound on the particle target count.
pub const MAX_PARTICLES: u32 = 10_000;

/// Everything one playback needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Declared motion preference.
    pub motion: MotionPreference,

    /// Seed for every random branch point; OS entropy when absent.
    pub seed: Option<u64>,

    /// Interval between eased transition frames.
    #[serde(with = "duration_serde")]
    pub frame_interval: Duration,

    /// Which elements exist.
    pub stage: StageConfig,

    /// Ambient loop pacing.
    pub ambient: AmbientConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            motion: MotionPreference::Full,
            seed: None,
            frame_interval: DEFAULT_FRAME,
            stage: StageConfig::default(),
            ambient: AmbientConfig::default(),
        }
    }
}

/// Stage composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageConfig {
    /// Roles attached to the in-memory stage.
    pub elements: Vec<Role>,

    /// Particle simulation settings.
    pub particles: ParticlesConfig,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            elements: Role::ALL.to_vec(),
            particles: ParticlesConfig::default(),
        }
    }
}

/// Particle simulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticlesConfig {
    /// Launch the simulation at all.
    pub enabled: bool,
    /// Baseline target count.
    pub count: u32,
    /// Baseline speed in pixels per second.
    pub speed: f64,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        let drift = DriftConfig::default();
        Self {
            enabled: true,
            count: drift.count,
            speed: drift.speed,
        }
    }
}

impl ParticlesConfig {
    /// Drift simulation parameters for these settings.
    #[must_use]
    pub fn drift(&self) -> DriftConfig {
        DriftConfig {
            count: self.count,
            speed: self.speed,
            ..DriftConfig::default()
        }
    }
}

/// Ambient loop pacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AmbientConfig {
    /// Shortest wait between ambient effects.
    #[serde(with = "duration_serde")]
    pub min_interval: Duration,

    /// Longest wait between ambient effects.
    #[serde(with = "duration_serde")]
    pub max_interval: Duration,

    /// Probability an ambient effect is a flicker.
    pub flicker_chance: f64,

    /// How long the CLI lets the ambient loop run before stopping it.
    #[serde(with = "duration_serde")]
    pub run_for: Duration,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        let timing = AmbientTiming::default();
        Self {
            min_interval: timing.min_interval,
            max_interval: timing.max_interval,
            flicker_chance: timing.flicker_chance,
            run_for: Duration::ZERO,
        }
    }
}

impl AmbientConfig {
    /// Flash loop timing for these settings.
    #[must_use]
    pub const fn timing(&self) -> AmbientTiming {
        AmbientTiming {
            min_interval: self.min_interval,
            max_interval: self.max_interval,
            flicker_chance: self.flicker_chance,
        }
    }
}

impl RunConfig {
    /// Checks cross-field rules, returning every issue found.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut push = |path: &str, message: String, severity: Severity| {
            issues.push(ValidationIssue {
                path: path.to_string(),
                message,
                severity,
            });
        };

        if self.frame_interval < Duration::from_millis(1) {
            push(
                "frame_interval",
                "must be at least 1ms".to_string(),
                Severity::Error,
            );
        } else if self.frame_interval > Duration::from_millis(100) {
            push(
                "frame_interval",
                format!(
                    "{}ms is coarser than 10 fps; transitions will look choppy",
                    self.frame_interval.as_millis()
                ),
                Severity::Warning,
            );
        }

        let mut seen = HashSet::new();
        for (i, role) in self.stage.elements.iter().enumerate() {
            if !seen.insert(*role) {
                push(
                    &format!("stage.elements[{i}]"),
                    format!("duplicate role '{role}'"),
                    Severity::Warning,
                );
            }
        }
        for role in Role::REQUIRED {
            if !seen.contains(&role) {
                push(
                    "stage.elements",
                    format!("required role '{role}' is absent; the sequence will be bypassed"),
                    Severity::Warning,
                );
            }
        }

        let particles = &self.stage.particles;
        if particles.count > MAX_PARTICLES {
            push(
                "stage.particles.count",
                format!("{} exceeds the limit of {MAX_PARTICLES}", particles.count),
                Severity::Error,
            );
        }
        if !particles.speed.is_finite() || particles.speed < 0.0 {
            push(
                "stage.particles.speed",
                format!("must be a non-negative number, got {}", particles.speed),
                Severity::Error,
            );
        }

        let ambient = &self.ambient;
        if ambient.min_interval.is_zero() {
            push(
                "ambient.min_interval",
                "must be greater than zero".to_string(),
                Severity::Error,
            );
        }
        if ambient.min_interval > ambient.max_interval {
            push(
                "ambient.max_interval",
                "must not be shorter than ambient.min_interval".to_string(),
                Severity::Error,
            );
        }
        if !(0.0..=1.0).contains(&ambient.flicker_chance) {
            push(
                "ambient.flicker_chance",
                format!("must be within [0, 1], got {}", ambient.flicker_chance),
                Severity::Error,
            );
        }

        issues
    }
}
