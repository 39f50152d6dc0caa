//! Reduced-motion signal.
//!
//! The orchestrator reads the signal once per run; each flash effect reads
//! it again on its own, so an effect started after the host flips the
//! setting still honours it.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Source of the "user prefers reduced motion" signal.
pub trait MotionQuery: Send + Sync {
    /// Whether motion should be suppressed right now.
    fn prefers_reduced_motion(&self) -> bool;
}

/// Declared motion preference, as read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionPreference {
    /// Play the full choreography.
    #[default]
    Full,
    /// Skip straight to the final state.
    Reduced,
}

/// Host-controlled motion switch.
#[derive(Debug, Default)]
pub struct MotionSetting {
    reduced: AtomicBool,
}

impl MotionSetting {
    /// Creates a switch with the given initial value.
    #[must_use]
    pub const fn new(reduced: bool) -> Self {
        Self {
            reduced: AtomicBool::new(reduced),
        }
    }

    /// Changes the preference; only runs started afterwards observe it.
    pub fn set_reduced(&self, reduced: bool) {
        self.reduced.store(reduced, Ordering::SeqCst);
    }
}

impl From<MotionPreference> for MotionSetting {
    fn from(pref: MotionPreference) -> Self {
        Self::new(pref == MotionPreference::Reduced)
    }
}

impl MotionQuery for MotionSetting {
    fn prefers_reduced_motion(&self) -> bool {
        self.reduced.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_maps_to_setting() {
        assert!(MotionSetting::from(MotionPreference::Reduced).prefers_reduced_motion());
        assert!(!MotionSetting::from(MotionPreference::Full).prefers_reduced_motion());
    }

    #[test]
    fn setting_can_flip() {
        let setting = MotionSetting::default();
        assert!(!setting.prefers_reduced_motion());
        setting.set_reduced(true);
        assert!(setting.prefers_reduced_motion());
    }

    #[test]
    fn preference_deserializes_lowercase() {
        let pref: MotionPreference = serde_yaml::from_str("reduced").unwrap();
        assert_eq!(pref, MotionPreference::Reduced);
    }
}
