//! Initial hidden states, reveal transitions and the reveal-everything
//! fallback.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::stage::{Element, Role, Stage};
use crate::tween::{Ease, StyleFrame, Transition};

use super::cues::REVEALED_CLASS;
use super::phase::Phase;

/// How long the loading indicator takes to fade out.
pub const LOADER_FADE: Duration = Duration::from_millis(500);

/// Title before impact: invisible, scaled up, heavily blurred.
pub const TITLE_HIDDEN: StyleFrame = StyleFrame {
    opacity: 0.0,
    scale: 1.5,
    translate_y: 0.0,
    blur_px: 20.0,
};

/// Tagline before settle: invisible, pushed down.
pub const TAGLINE_HIDDEN: StyleFrame = StyleFrame {
    opacity: 0.0,
    scale: 1.0,
    translate_y: 30.0,
    blur_px: 0.0,
};

/// Coming-soon marker before settle: invisible, scaled down.
pub const COMING_SOON_HIDDEN: StyleFrame = StyleFrame {
    opacity: 0.0,
    scale: 0.8,
    translate_y: 0.0,
    blur_px: 0.0,
};

/// The title's unblur/scale-in, lasting exactly the impact phase.
#[must_use]
pub fn title_reveal() -> Transition {
    Transition {
        from: TITLE_HIDDEN,
        to: StyleFrame::REST,
        duration: Phase::Impact.nominal().unwrap_or(Duration::from_millis(400)),
        ease: Ease::CubicOut,
    }
}

/// The tagline's fade-up.
#[must_use]
pub const fn tagline_reveal() -> Transition {
    Transition {
        from: TAGLINE_HIDDEN,
        to: StyleFrame::REST,
        duration: Duration::from_millis(600),
        ease: Ease::CubicOut,
    }
}

/// The coming-soon marker's overshooting scale-in.
#[must_use]
pub const fn coming_soon_reveal() -> Transition {
    Transition {
        from: COMING_SOON_HIDDEN,
        to: StyleFrame::REST,
        duration: Duration::from_millis(500),
        ease: Ease::BackOut,
    }
}

/// Required elements, resolved once per run.
#[derive(Debug, Clone)]
pub struct Cast {
    /// Page root (shake target).
    pub page: Arc<dyn Element>,
    /// Content container.
    pub content: Arc<dyn Element>,
    /// Headline.
    pub title: Arc<dyn Element>,
    /// Line under the title.
    pub tagline: Arc<dyn Element>,
    /// Coming-soon marker.
    pub coming_soon: Arc<dyn Element>,
    /// Lightning overlay.
    pub lightning: Arc<dyn Element>,
    /// Optional loading indicator.
    pub loader: Option<Arc<dyn Element>>,
    /// Optional slash overlay.
    pub slash_overlay: Option<Arc<dyn Element>>,
    /// Optional slash line.
    pub slash_line: Option<Arc<dyn Element>>,
    /// Optional burst overlay.
    pub burst: Option<Arc<dyn Element>>,
    /// Optional particle container.
    pub particle_container: Option<Arc<dyn Element>>,
}

impl Cast {
    /// Resolves every role, or returns the required roles that are missing.
    ///
    /// # Errors
    ///
    /// Returns the list of absent required roles, in [`Role::REQUIRED`]
    /// order.
    pub fn resolve(stage: &Stage) -> Result<Self, Vec<Role>> {
        let get = |role| stage.get(role);
        match (
            get(Role::Content),
            get(Role::Title),
            get(Role::Tagline),
            get(Role::ComingSoon),
            get(Role::Lightning),
        ) {
            (Some(content), Some(title), Some(tagline), Some(coming_soon), Some(lightning)) => {
                Ok(Self {
                    page: stage.page(),
                    content,
                    title,
                    tagline,
                    coming_soon,
                    lightning,
                    loader: get(Role::LoadingIndicator),
                    slash_overlay: get(Role::SlashOverlay),
                    slash_line: get(Role::SlashLine),
                    burst: get(Role::Burst),
                    particle_container: get(Role::ParticleContainer),
                })
            }
            _ => Err(stage.missing_required()),
        }
    }
}

/// Snapshots the hidden starting state of everything that gets revealed.
pub fn prepare_hidden(cast: &Cast) {
    TITLE_HIDDEN.apply_to(cast.title.as_ref());
    TAGLINE_HIDDEN.apply_to(cast.tagline.as_ref());
    COMING_SOON_HIDDEN.apply_to(cast.coming_soon.as_ref());
    if let Some(overlay) = &cast.slash_overlay {
        overlay.set_visible(true);
    }
}

/// Makes the content container visible.
pub fn show_content(content: &dyn Element) {
    content.set_visible(true);
    content.set_opacity(1.0);
}

/// Fades the loading indicator out, then removes it from layout.
///
/// Runs on its own task; the caller does not wait.
pub fn hide_loader(loader: Arc<dyn Element>, frame: Duration) {
    let fade = Transition {
        from: StyleFrame {
            opacity: loader.style().opacity,
            ..StyleFrame::REST
        },
        to: StyleFrame {
            opacity: 0.0,
            ..StyleFrame::REST
        },
        duration: LOADER_FADE,
        ease: Ease::Linear,
    };
    tokio::spawn(async move {
        fade.play(loader.as_ref(), frame).await;
        loader.set_visible(false);
    });
}

/// Plays a reveal and marks the element `revealed` when it lands.
pub async fn reveal_and_mark(element: Arc<dyn Element>, transition: Transition, frame: Duration) {
    transition.play(element.as_ref(), frame).await;
    element.add_class(REVEALED_CLASS);
}

/// Renders the final revealed state directly, touching whatever exists.
///
/// Used for every bypass: reduced motion, missing elements and unexpected
/// failure. Synchronous and idempotent.
pub fn reveal_all(stage: &Stage) {
    if let Some(loader) = stage.get(Role::LoadingIndicator) {
        loader.set_opacity(0.0);
        loader.set_visible(false);
    }
    if let Some(content) = stage.get(Role::Content) {
        show_content(content.as_ref());
    }
    for role in Role::TEXT {
        if let Some(element) = stage.get(role) {
            StyleFrame::REST.apply_to(element.as_ref());
            element.set_visible(true);
            if role != Role::Title {
                element.add_class(REVEALED_CLASS);
            }
        }
    }
    if let Some(lightning) = stage.get(Role::Lightning) {
        lightning.set_opacity(0.0);
        lightning.set_tint(None);
    }
    debug!("final state rendered without animation");
}
