//! Particle velocity adapter.
//!
//! `speed_up` and `slow_down` are exact inverses on the live particle set:
//! one multiplies by the factors, the other divides by the same factors.
//! Particles spawned between the two calls keep their baseline velocity.

use tracing::{debug, trace};

use super::ParticleSystem;

/// Velocity multiplier applied during anticipation.
pub const SPEED_FACTOR: f64 = 3.0;

/// Target count multiplier applied during anticipation.
pub const DENSITY_FACTOR: f64 = 1.5;

/// Triples every live velocity and raises the target count by half.
///
/// No-op when `handle` is `None`.
pub fn speed_up(handle: Option<&dyn ParticleSystem>) {
    let Some(system) = handle else {
        trace!("speed_up without particle system");
        return;
    };
    system.for_each_velocity(&mut |v| {
        v.x *= SPEED_FACTOR;
        v.y *= SPEED_FACTOR;
    });
    let target = system.target_count() * DENSITY_FACTOR;
    system.set_target_count(target);
    debug!(live = system.live_count(), target, "particles sped up");
}

/// Reverts [`speed_up`].
///
/// No-op when `handle` is `None`.
pub fn slow_down(handle: Option<&dyn ParticleSystem>) {
    let Some(system) = handle else {
        trace!("slow_down without particle system");
        return;
    };
    system.for_each_velocity(&mut |v| {
        v.x /= SPEED_FACTOR;
        v.y /= SPEED_FACTOR;
    });
    let target = system.target_count() / DENSITY_FACTOR;
    system.set_target_count(target);
    debug!(live = system.live_count(), target, "particles slowed down");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use proptest::prelude::*;

    use super::*;
    use crate::particles::Velocity;

    #[derive(Debug)]
    struct Fixed {
        velocities: Mutex<Vec<Velocity>>,
        target: Mutex<f64>,
    }

    impl Fixed {
        fn new(velocities: Vec<Velocity>, target: f64) -> Self {
            Self {
                velocities: Mutex::new(velocities),
                target: Mutex::new(target),
            }
        }

        fn velocities(&self) -> Vec<Velocity> {
            self.velocities.lock().unwrap().clone()
        }
    }

    impl ParticleSystem for Fixed {
        fn for_each_velocity(&self, visit: &mut dyn FnMut(&mut Velocity)) {
            self.velocities.lock().unwrap().iter_mut().for_each(visit);
        }

        fn target_count(&self) -> f64 {
            *self.target.lock().unwrap()
        }

        fn set_target_count(&self, count: f64) {
            *self.target.lock().unwrap() = count;
        }

        fn live_count(&self) -> usize {
            self.velocities.lock().unwrap().len()
        }
    }

    #[test]
    fn speed_up_scales_velocity_and_density() {
        let system = Fixed::new(vec![Velocity::new(1.0, -2.0)], 40.0);
        speed_up(Some(&system));
        assert_eq!(system.velocities(), vec![Velocity::new(3.0, -6.0)]);
        assert!((system.target_count() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_particles_only_changes_target() {
        let system = Fixed::new(Vec::new(), 10.0);
        speed_up(Some(&system));
        assert_eq!(system.live_count(), 0);
        assert!((system.target_count() - 15.0).abs() < f64::EPSILON);
        slow_down(Some(&system));
        assert!((system.target_count() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn absent_handle_is_a_no_op() {
        speed_up(None);
        slow_down(None);
    }

    #[test]
    fn particles_spawned_between_calls_are_slowed_below_baseline() {
        let system = Fixed::new(vec![Velocity::new(3.0, 0.0)], 1.0);
        speed_up(Some(&system));
        system.velocities.lock().unwrap().push(Velocity::new(3.0, 0.0));
        slow_down(Some(&system));
        assert_eq!(
            system.velocities(),
            vec![Velocity::new(3.0, 0.0), Velocity::new(1.0, 0.0)]
        );
    }

    proptest! {
        // Sixteenths keep the products exactly representable, so the
        // round-trip can be compared with `==`.
        #[test]
        fn speed_up_then_slow_down_restores_state(
            raw in prop::collection::vec((-100_000i32..100_000, -100_000i32..100_000), 0..32),
            target in 0u32..10_000,
        ) {
            let velocities: Vec<Velocity> = raw
                .iter()
                .map(|&(x, y)| Velocity::new(f64::from(x) / 16.0, f64::from(y) / 16.0))
                .collect();
            let system = Fixed::new(velocities.clone(), f64::from(target));

            speed_up(Some(&system));
            slow_down(Some(&system));

            prop_assert_eq!(system.velocities(), velocities);
            prop_assert_eq!(system.target_count(), f64::from(target));
        }
    }
}
