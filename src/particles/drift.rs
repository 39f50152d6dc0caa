//! Headless drifting-particle simulation.
//!
//! Particles float upward with a little sideways wander and wrap around
//! the field edges. Each [`DriftField::step`] tops the population up to
//! the target count (spawning at baseline velocity) or trims it down.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::chance::Chance;
use crate::error::ParticleError;
use crate::stage::Element;
use crate::tween::DEFAULT_FRAME;

use super::{ParticleLauncher, ParticleSystem, Result, Velocity};

/// Class added to the container once a simulation is attached.
pub const LIVE_CLASS: &str = "particles-live";

/// Field dimensions and population parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriftConfig {
    /// Field width in pixels.
    pub width: f64,
    /// Field height in pixels.
    pub height: f64,
    /// Initial target count.
    pub count: u32,
    /// Baseline speed in pixels per second.
    pub speed: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            count: 60,
            speed: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    x: f64,
    y: f64,
    velocity: Velocity,
}

/// A running drift simulation.
pub struct DriftField {
    config: DriftConfig,
    chance: Arc<dyn Chance>,
    particles: Mutex<Vec<Particle>>,
    target: Mutex<f64>,
}

impl DriftField {
    /// Creates a field populated up to `config.count`.
    #[must_use]
    pub fn new(config: DriftConfig, chance: Arc<dyn Chance>) -> Self {
        let field = Self {
            config,
            chance,
            particles: Mutex::new(Vec::new()),
            target: Mutex::new(f64::from(config.count)),
        };
        field.rebalance();
        field
    }

    /// Advances every particle by `dt` and rebalances the population.
    pub fn step(&self, dt: Duration) {
        let secs = dt.as_secs_f64();
        let (w, h) = (self.config.width, self.config.height);
        {
            let mut particles = self.particles.lock().unwrap_or_else(PoisonError::into_inner);
            for p in particles.iter_mut() {
                p.x = p.velocity.x.mul_add(secs, p.x).rem_euclid(w);
                p.y = p.velocity.y.mul_add(secs, p.y).rem_euclid(h);
            }
        }
        self.rebalance();
    }

    /// Mean particle speed, or zero for an empty field.
    #[must_use]
    pub fn mean_speed(&self) -> f64 {
        let particles = self.particles.lock().unwrap_or_else(PoisonError::into_inner);
        if particles.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = particles.len() as f64;
        particles
            .iter()
            .map(|p| p.velocity.x.hypot(p.velocity.y))
            .sum::<f64>()
            / n
    }

    fn rebalance(&self) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let wanted = self.target_count().max(0.0).floor() as usize;
        let mut particles = self.particles.lock().unwrap_or_else(PoisonError::into_inner);
        if particles.len() > wanted {
            particles.truncate(wanted);
        }
        while particles.len() < wanted {
            particles.push(self.spawn());
        }
    }

    fn spawn(&self) -> Particle {
        let speed = self.config.speed;
        Particle {
            x: self.chance.sample() * self.config.width,
            y: self.chance.sample() * self.config.height,
            velocity: Velocity::new(
                (self.chance.sample() - 0.5) * speed,
                -speed * 0.5f64.mul_add(self.chance.sample(), 0.5),
            ),
        }
    }
}

impl ParticleSystem for DriftField {
    fn for_each_velocity(&self, visit: &mut dyn FnMut(&mut Velocity)) {
        let mut particles = self.particles.lock().unwrap_or_else(PoisonError::into_inner);
        for p in particles.iter_mut() {
            visit(&mut p.velocity);
        }
    }

    fn target_count(&self) -> f64 {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_target_count(&self, count: f64) {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = count;
    }

    fn live_count(&self) -> usize {
        self.particles.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl std::fmt::Debug for DriftField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftField")
            .field("config", &self.config)
            .field("live", &self.live_count())
            .field("target", &self.target_count())
            .finish_non_exhaustive()
    }
}

/// Launches a [`DriftField`] and steps it on its own task.
///
/// The stepping task holds only a weak reference and exits once every
/// handle to the field has been dropped.
pub struct DriftLauncher {
    config: DriftConfig,
    chance: Arc<dyn Chance>,
    frame: Duration,
}

impl DriftLauncher {
    /// Creates a launcher stepping at [`DEFAULT_FRAME`].
    #[must_use]
    pub fn new(config: DriftConfig, chance: Arc<dyn Chance>) -> Self {
        Self {
            config,
            chance,
            frame: DEFAULT_FRAME,
        }
    }

    /// Overrides the stepping interval.
    #[must_use]
    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame.max(Duration::from_millis(1));
        self
    }
}

#[async_trait::async_trait]
impl ParticleLauncher for DriftLauncher {
    async fn launch(&self, container: Arc<dyn Element>) -> Result<Arc<dyn ParticleSystem>> {
        let DriftConfig {
            width,
            height,
            speed,
            ..
        } = self.config;
        let has_area = width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0;
        if !has_area || !speed.is_finite() {
            return Err(ParticleError::LaunchFailed(format!(
                "degenerate field {width}x{height} at speed {speed}"
            )));
        }

        let field = Arc::new(DriftField::new(self.config, Arc::clone(&self.chance)));
        container.add_class(LIVE_CLASS);
        debug!(count = self.config.count, "particle field launched");

        let weak: Weak<DriftField> = Arc::downgrade(&field);
        let frame = self.frame;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(field) = weak.upgrade() else {
                    trace!("particle field dropped; stepping task exiting");
                    break;
                };
                field.step(frame);
            }
        });

        Ok(field)
    }
}

impl std::fmt::Debug for DriftLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftLauncher")
            .field("config", &self.config)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}
