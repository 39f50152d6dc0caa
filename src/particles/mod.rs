//! Ambient particle simulation seam.
//!
//! The entrance sequence never owns the particle simulation; it holds an
//! opaque, possibly-absent handle and adjusts it through the velocity
//! adapter in [`velocity`]. [`drift`] provides a small headless
//! simulation so the CLI and the tests have a live system to drive.

pub mod drift;
pub mod velocity;

use std::sync::Arc;

use serde::Serialize;

use crate::error::ParticleError;
use crate::stage::Element;

pub use drift::{DriftConfig, DriftField, DriftLauncher};
pub use velocity::{DENSITY_FACTOR, SPEED_FACTOR, slow_down, speed_up};

/// Result type alias for particle operations.
pub type Result<T> = std::result::Result<T, ParticleError>;

/// Planar velocity of one particle, in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Velocity {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Velocity {
    /// Creates a velocity.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Handle to a running particle simulation.
///
/// Only the operations the velocity adapter needs are exposed: visiting
/// each live particle's velocity and reading/writing the target particle
/// count (kept as `f64` so density scaling can round-trip).
pub trait ParticleSystem: Send + Sync {
    /// Calls `visit` once for every live particle's velocity.
    fn for_each_velocity(&self, visit: &mut dyn FnMut(&mut Velocity));

    /// Number of particles the simulation tries to keep alive.
    fn target_count(&self) -> f64;

    /// Changes the target particle count.
    fn set_target_count(&self, count: f64);

    /// Number of live particles.
    fn live_count(&self) -> usize;
}

/// Starts a particle simulation against a container element.
#[async_trait::async_trait]
pub trait ParticleLauncher: Send + Sync {
    /// Launches the simulation, returning its handle.
    ///
    /// # Errors
    ///
    /// Returns [`ParticleError::LaunchFailed`] if the simulation cannot
    /// start. The orchestrator logs the failure and runs without particles.
    async fn launch(&self, container: Arc<dyn Element>) -> Result<Arc<dyn ParticleSystem>>;
}
