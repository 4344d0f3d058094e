//! Canvas/layout store: the ordered component list of one open dashboard and
//! its selection.
//!
//! DESIGN
//! ======
//! The `components` vector is the only ordering signal. `position.y` is kept
//! in the document for renderers that draw absolutely positioned tiles, but
//! the store derives it from order: every structural change restacks the
//! list so each tile sits below the previous one. `x`, `width` and `height`
//! stay user-owned.
//!
//! Selection is a single optional id and never dangles: deleting the selected
//! component clears it, and selecting an unknown id is refused.

use serde::{Deserialize, Serialize};

use crate::doc::{ComponentBody, ComponentId, ComponentKind, DashboardComponent, Layout, Position, palette_entry};

/// Vertical gap between stacked components.
pub const STACK_GAP: f64 = 16.0;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("component {id} is a {current} and cannot become a {requested}")]
    KindChange { id: ComponentId, current: String, requested: String },
}

impl crate::routes::ErrorCode for LayoutError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::KindChange { .. } => "E_COMPONENT_KIND_CHANGE",
        }
    }
}

/// Reorder direction for `LayoutStore::move_component`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Sparse update for a component. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentPatch {
    pub title: Option<String>,
    pub body: Option<ComponentBody>,
    pub position: Option<Position>,
}

impl ComponentPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.position.is_none()
    }
}

/// In-memory component list for one editor.
#[derive(Debug, Clone, Default)]
pub struct LayoutStore {
    components: Vec<DashboardComponent>,
    selected: Option<ComponentId>,
}

impl LayoutStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a stored layout. Positions are taken as stored.
    #[must_use]
    pub fn from_layout(layout: Layout) -> Self {
        Self { components: layout.components, selected: None }
    }

    #[must_use]
    pub fn to_layout(&self) -> Layout {
        Layout { components: self.components.clone() }
    }

    #[must_use]
    pub fn components(&self) -> &[DashboardComponent] {
        &self.components
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DashboardComponent> {
        self.components.iter().find(|c| c.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a component. Returns false (selection unchanged) if absent.
    pub fn select(&mut self, id: &str) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_owned());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Append a new component of `kind` with default title and config, stack
    /// it below the existing ones, and select it.
    pub fn add(&mut self, kind: ComponentKind) -> &DashboardComponent {
        self.add_with_id(kind, DashboardComponent::new_id())
    }

    fn add_with_id(&mut self, kind: ComponentKind, id: ComponentId) -> &DashboardComponent {
        let entry = palette_entry(kind);
        let component = DashboardComponent {
            id: id.clone(),
            title: entry.default_title.to_owned(),
            body: ComponentBody::default_for(kind),
            position: Position { x: 0.0, y: self.next_y(), width: entry.width, height: entry.height },
        };
        self.components.push(component);
        self.selected = Some(id);
        let last = self.components.len() - 1;
        &self.components[last]
    }

    /// Shallow-merge `patch` into the component with `id`.
    ///
    /// Returns `Ok(false)` if no component has that id.
    ///
    /// # Errors
    ///
    /// Returns `KindChange` if the patch body would change the component type.
    pub fn update(&mut self, id: &str, patch: ComponentPatch) -> Result<bool, LayoutError> {
        let Some(index) = self.index_of(id) else {
            return Ok(false);
        };
        let component = &mut self.components[index];

        if let Some(body) = &patch.body {
            if body.type_tag() != component.type_tag() {
                return Err(LayoutError::KindChange {
                    id: component.id.clone(),
                    current: component.type_tag().to_owned(),
                    requested: body.type_tag().to_owned(),
                });
            }
        }

        let restack = patch.position.is_some();
        if let Some(title) = patch.title {
            component.title = title;
        }
        if let Some(body) = patch.body {
            component.body = body;
        }
        if let Some(position) = patch.position {
            component.position = position;
        }
        if restack {
            self.restack();
        }
        Ok(true)
    }

    /// Remove a component. Clears the selection if it pointed at `id`.
    /// Returns false if no component has that id.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.components.remove(index);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.restack();
        true
    }

    /// Swap a component with its neighbour. No-op at either boundary or for
    /// an unknown id; returns whether the order changed.
    pub fn move_component(&mut self, id: &str, direction: Direction) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let target = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < self.components.len() => index + 1,
            _ => return false,
        };
        self.components.swap(index, target);
        self.restack();
        true
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn next_y(&self) -> f64 {
        self.components
            .last()
            .map_or(0.0, |c| c.position.y + c.position.height + STACK_GAP)
    }

    /// Recompute every `y` from array order.
    fn restack(&mut self) {
        let mut y = 0.0;
        for component in &mut self.components {
            component.position.y = y;
            y += component.position.height + STACK_GAP;
        }
    }
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
