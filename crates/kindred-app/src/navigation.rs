// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::ViewId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewChange {
    pub from: ViewId,
    pub to: ViewId,
}

/// Which top-level view is active. Any view may follow any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation {
    active: ViewId,
}

impl Navigation {
    pub const fn new(initial: ViewId) -> Self {
        Self { active: initial }
    }

    pub const fn active_view(&self) -> ViewId {
        self.active
    }

    /// Returns the change, or `None` when `view` is already active.
    pub fn set_active_view(&mut self, view: ViewId) -> Option<ViewChange> {
        if self.active == view {
            return None;
        }
        let change = ViewChange {
            from: self.active,
            to: view,
        };
        self.active = view;
        Some(change)
    }
}
