//! Logical element roles.
//!
//! The orchestrator never looks elements up by selector; it asks the
//! [`Stage`](super::Stage) for a role and copes with absence.

use serde::{Deserialize, Serialize};

/// Logical role of an element on the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Spinner shown until the sequence takes over.
    LoadingIndicator,
    /// Container wrapping all text elements.
    Content,
    /// Headline; receives the impact reveal and glitches.
    Title,
    /// Line under the title.
    Tagline,
    /// "Coming soon" marker.
    ComingSoon,
    /// Full-screen lightning overlay driven by the flash engine.
    Lightning,
    /// Layer holding the slash line.
    SlashOverlay,
    /// The animated slash line itself.
    SlashLine,
    /// Radial burst overlay.
    Burst,
    /// Host element for the particle simulation.
    ParticleContainer,
}

impl Role {
    /// Every role, in document order.
    pub const ALL: [Self; 10] = [
        Self::LoadingIndicator,
        Self::Content,
        Self::Title,
        Self::Tagline,
        Self::ComingSoon,
        Self::Lightning,
        Self::SlashOverlay,
        Self::SlashLine,
        Self::Burst,
        Self::ParticleContainer,
    ];

    /// Roles without which no animation is attempted.
    pub const REQUIRED: [Self; 5] = [
        Self::Content,
        Self::Title,
        Self::Tagline,
        Self::ComingSoon,
        Self::Lightning,
    ];

    /// Text roles brought to their final state by the reveal fallback.
    pub const TEXT: [Self; 3] = [Self::Title, Self::Tagline, Self::ComingSoon];

    /// Stable kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadingIndicator => "loading-indicator",
            Self::Content => "content",
            Self::Title => "title",
            Self::Tagline => "tagline",
            Self::ComingSoon => "coming-soon",
            Self::Lightning => "lightning",
            Self::SlashOverlay => "slash-overlay",
            Self::SlashLine => "slash-line",
            Self::Burst => "burst",
            Self::ParticleContainer => "particle-container",
        }
    }

    /// Whether the sequence aborts to the fallback when this role is absent.
    #[must_use]
    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_roles_exclude_optional_overlays() {
        assert!(Role::Title.is_required());
        assert!(Role::Lightning.is_required());
        assert!(!Role::SlashLine.is_required());
        assert!(!Role::Burst.is_required());
        assert!(!Role::ParticleContainer.is_required());
        assert!(!Role::LoadingIndicator.is_required());
    }

    #[test]
    fn parse_round_trips_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("footer".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let yaml = serde_yaml::to_string(&Role::ComingSoon).unwrap();
        assert_eq!(yaml.trim(), "coming-soon");
        let role: Role = serde_yaml::from_str("particle-container").unwrap();
        assert_eq!(role, Role::ParticleContainer);
    }
}
