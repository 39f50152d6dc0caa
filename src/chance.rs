//! Random branch points.
//!
//! Every probabilistic decision in the choreography (third flicker pulse,
//! ambient flicker-vs-flash, ambient wait, extra glitch) draws from a
//! [`Chance`] so tests can script the outcome.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform samples in `[0, 1)`.
pub trait Chance: Send + Sync {
    /// Draws the next sample.
    fn sample(&self) -> f64;

    /// Returns `true` with probability `p`.
    fn hit(&self, p: f64) -> bool {
        self.sample() < p
    }

    /// Draws a duration uniformly from `[lo, hi]`.
    fn between(&self, lo: Duration, hi: Duration) -> Duration {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo).mul_f64(self.sample())
    }
}

/// `StdRng`-backed chance, seeded for reproducible runs.
#[derive(Debug)]
pub struct SeededChance {
    rng: Mutex<StdRng>,
}

impl SeededChance {
    /// Seeds from `seed`, or from the OS when `None`.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Chance for SeededChance {
    fn sample(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random::<f64>()
    }
}

/// Replays a fixed list of samples, then repeats `fallback` forever.
#[derive(Debug)]
pub struct ScriptedChance {
    samples: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl ScriptedChance {
    /// Creates a script.
    #[must_use]
    pub fn new(samples: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            samples: Mutex::new(samples.into_iter().collect()),
            fallback,
        }
    }

    /// Always returns `value`.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new([], value)
    }
}

impl Chance for ScriptedChance {
    fn sample(&self) -> f64 {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.fallback)
    }
}
