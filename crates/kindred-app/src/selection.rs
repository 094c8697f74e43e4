// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::EntityId;
use crate::model::ViewId;

/// At most one selected entity, scoped to the view it was picked in.
///
/// Rescoping to another view always clears the selection, so an id picked in
/// one view can never be read back as belonging to another. Load failures
/// never clear it; only a view change or an explicit deselect does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStore {
    view: ViewId,
    selected: Option<EntityId>,
}

impl SelectionStore {
    pub const fn new(view: ViewId) -> Self {
        Self {
            view,
            selected: None,
        }
    }

    pub const fn view(&self) -> ViewId {
        self.view
    }

    pub fn selected_id(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    /// The selection, only if it was made in `view`.
    pub fn selected_for(&self, view: ViewId) -> Option<&EntityId> {
        if self.view == view {
            self.selected.as_ref()
        } else {
            None
        }
    }

    pub fn set_selected_id(&mut self, id: EntityId) -> bool {
        if self.selected.as_ref() == Some(&id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Returns the id that was cleared, if any.
    pub fn clear_selection(&mut self) -> Option<EntityId> {
        self.selected.take()
    }

    pub fn rescope(&mut self, view: ViewId) -> Option<EntityId> {
        self.view = view;
        self.clear_selection()
    }
}
