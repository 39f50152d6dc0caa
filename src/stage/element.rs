//! Element model.
//!
//! An [`Element`] is anything whose visual state the sequence can read and
//! mutate: opacity, a transform (scale + vertical offset), blur, display,
//! an optional gradient tint and a set of marker classes. Hosts implement
//! [`Element::style`] and [`Element::update`]; every other method is
//! derived from those two.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::Role;

/// RGBA color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha, 0.0 to 1.0.
    pub a: f32,
}

impl Rgba {
    /// Creates a color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Directional two-stop gradient laid over an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tint {
    /// Gradient direction in degrees (CSS convention, 180 = top to bottom).
    pub angle_deg: f32,
    /// Color at the gradient start.
    pub from: Rgba,
    /// Color at the gradient end.
    pub to: Rgba,
}

/// Snapshot of an element's visual state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementStyle {
    /// 0.0 (invisible) to 1.0.
    pub opacity: f32,
    /// Uniform scale factor.
    pub scale: f32,
    /// Vertical offset in pixels, positive is downward.
    pub translate_y: f32,
    /// Gaussian blur radius in pixels.
    pub blur_px: f32,
    /// Whether the element takes part in layout at all.
    pub visible: bool,
    /// Background gradient, if any.
    pub tint: Option<Tint>,
    /// Marker classes (`revealed`, `pulse`, `glitch`, ...).
    pub classes: BTreeSet<String>,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            scale: 1.0,
            translate_y: 0.0,
            blur_px: 0.0,
            visible: true,
            tint: None,
            classes: BTreeSet::new(),
        }
    }
}

impl ElementStyle {
    /// Whether the element is in its final, fully revealed resting state.
    #[must_use]
    pub fn is_at_rest(&self) -> bool {
        self.visible
            && (self.opacity - 1.0).abs() < f32::EPSILON
            && (self.scale - 1.0).abs() < f32::EPSILON
            && self.translate_y.abs() < f32::EPSILON
            && self.blur_px.abs() < f32::EPSILON
    }

    /// Whether the element carries the given class.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

/// A mutable visual target.
///
/// Implementations must be cheap to mutate from any task; the sequence
/// writes to each element from at most one logical writer per phase.
pub trait Element: Send + Sync + fmt::Debug {
    /// Returns the current visual state.
    fn style(&self) -> ElementStyle;

    /// Applies an in-place mutation to the visual state.
    fn update(&self, mutate: &mut dyn FnMut(&mut ElementStyle));

    /// Sets opacity, clamped to `0.0..=1.0`.
    fn set_opacity(&self, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        self.update(&mut |s| s.opacity = opacity);
    }

    /// Sets or clears the gradient tint.
    fn set_tint(&self, tint: Option<Tint>) {
        self.update(&mut |s| s.tint = tint);
    }

    /// Sets display.
    fn set_visible(&self, visible: bool) {
        self.update(&mut |s| s.visible = visible);
    }

    /// Adds a marker class.
    fn add_class(&self, class: &str) {
        self.update(&mut |s| {
            s.classes.insert(class.to_owned());
        });
    }

    /// Removes a marker class.
    fn remove_class(&self, class: &str) {
        self.update(&mut |s| {
            s.classes.remove(class);
        });
    }

    /// Whether the element currently carries `class`.
    fn has_class(&self, class: &str) -> bool {
        self.style().has_class(class)
    }
}

/// In-memory element backed by a mutex-guarded [`ElementStyle`].
///
/// Used by the CLI's headless stage and by tests.
pub struct StyleNode {
    role: Option<Role>,
    style: Mutex<ElementStyle>,
}

impl StyleNode {
    /// Creates a node in the default (fully visible, untransformed) state.
    #[must_use]
    pub fn new(role: Option<Role>) -> Self {
        Self::with_style(role, ElementStyle::default())
    }

    /// Creates a node with an explicit starting style.
    #[must_use]
    pub fn with_style(role: Option<Role>, style: ElementStyle) -> Self {
        Self {
            role,
            style: Mutex::new(style),
        }
    }

    /// Role this node was created for, `None` for the page root.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }
}

impl Element for StyleNode {
    fn style(&self) -> ElementStyle {
        self.style
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, mutate: &mut dyn FnMut(&mut ElementStyle)) {
        let mut guard = self.style.lock().unwrap_or_else(PoisonError::into_inner);
        mutate(&mut guard);
    }
}

impl fmt::Debug for StyleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.role.map_or("page", Role::as_str);
        f.debug_struct("StyleNode")
            .field("role", &name)
            .finish_non_exhaustive()
    }
}
