//! Stage: the set of elements the sequence animates.
//!
//! A [`Stage`] owns a page root (target of the screen shake) and a registry
//! of role-addressed elements. Elements may be attached or detached at any
//! time; the orchestrator resolves roles once per run.

pub mod element;
pub mod role;

use std::sync::Arc;

use dashmap::DashMap;

pub use element::{Element, ElementStyle, Rgba, StyleNode, Tint};
pub use role::Role;

/// Registry of role-addressed elements plus the page root.
pub struct Stage {
    page: Arc<dyn Element>,
    elements: DashMap<Role, Arc<dyn Element>>,
}

impl Stage {
    /// Creates an empty stage around the given page root.
    #[must_use]
    pub fn new(page: Arc<dyn Element>) -> Self {
        Self {
            page,
            elements: DashMap::new(),
        }
    }

    /// Creates a headless stage with a [`StyleNode`] for every given role.
    #[must_use]
    pub fn in_memory(roles: impl IntoIterator<Item = Role>) -> Self {
        let stage = Self::new(Arc::new(StyleNode::new(None)));
        for role in roles {
            stage.attach(role, Arc::new(StyleNode::new(Some(role))));
        }
        stage
    }

    /// Creates a headless stage with every role attached.
    #[must_use]
    pub fn complete() -> Self {
        Self::in_memory(Role::ALL)
    }

    /// Attaches (or replaces) the element for `role`.
    pub fn attach(&self, role: Role, element: Arc<dyn Element>) {
        self.elements.insert(role, element);
    }

    /// Detaches the element for `role`, returning it if present.
    pub fn detach(&self, role: Role) -> Option<Arc<dyn Element>> {
        self.elements.remove(&role).map(|(_, el)| el)
    }

    /// Resolves the element for `role`.
    #[must_use]
    pub fn get(&self, role: Role) -> Option<Arc<dyn Element>> {
        self.elements.get(&role).map(|el| Arc::clone(el.value()))
    }

    /// Whether `role` is attached.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.elements.contains_key(&role)
    }

    /// The page root.
    #[must_use]
    pub fn page(&self) -> Arc<dyn Element> {
        Arc::clone(&self.page)
    }

    /// Required roles that are not attached, in [`Role::REQUIRED`] order.
    #[must_use]
    pub fn missing_required(&self) -> Vec<Role> {
        Role::REQUIRED
            .into_iter()
            .filter(|r| !self.contains(*r))
            .collect()
    }

    /// Style snapshot for every attached role, in [`Role::ALL`] order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Role, ElementStyle)> {
        Role::ALL
            .into_iter()
            .filter_map(|r| self.get(r).map(|el| (r, el.style())))
            .collect()
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut roles: Vec<Role> = self.elements.iter().map(|e| *e.key()).collect();
        roles.sort();
        f.debug_struct("Stage")
            .field("roles", &roles)
            .finish_non_exhaustive()
    }
}
