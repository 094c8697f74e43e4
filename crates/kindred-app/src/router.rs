// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::filters::FilterPredicate;
use crate::ids::{EntityId, MountId};
use crate::model::ViewId;

/// Component mounted in the right-hand pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RightPane {
    ActivityFilters,
    DigestPreview,
    ChildDetails,
    RecipientDetails,
    GroupDetails,
    DraftPreview,
    MemoryBookFilters,
    Placeholder,
}

impl RightPane {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ActivityFilters => "activity filters",
            Self::DigestPreview => "digest preview",
            Self::ChildDetails => "child details",
            Self::RecipientDetails => "recipient details",
            Self::GroupDetails => "group details",
            Self::DraftPreview => "draft preview",
            Self::MemoryBookFilters => "memory book filters",
            Self::Placeholder => "placeholder",
        }
    }

    /// Panes that load and render the selected entity.
    pub const fn shows_selection(self) -> bool {
        matches!(
            self,
            Self::DigestPreview
                | Self::ChildDetails
                | Self::RecipientDetails
                | Self::GroupDetails
                | Self::DraftPreview
        )
    }

    /// Panes that edit the active view's filters.
    pub const fn shows_filters(self) -> bool {
        matches!(self, Self::ActivityFilters | Self::MemoryBookFilters)
    }
}

pub const fn route(view: ViewId) -> RightPane {
    match view {
        ViewId::Activity => RightPane::ActivityFilters,
        ViewId::Digests => RightPane::DigestPreview,
        ViewId::Children => RightPane::ChildDetails,
        ViewId::Recipients => RightPane::RecipientDetails,
        ViewId::Groups => RightPane::GroupDetails,
        ViewId::Drafts => RightPane::DraftPreview,
        ViewId::Settings => RightPane::Placeholder,
        ViewId::MemoryBook => RightPane::MemoryBookFilters,
    }
}

/// Routes a raw path segment; anything unrecognized gets the placeholder.
pub fn route_segment(segment: &str) -> RightPane {
    ViewId::parse(segment).map_or(RightPane::Placeholder, route)
}

/// Everything a mounted right pane reads. `mount` changes whenever the pane
/// is torn down and mounted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RightPaneProps<'a> {
    pub view: ViewId,
    pub pane: RightPane,
    pub mount: MountId,
    pub selection: Option<&'a EntityId>,
    pub filters: Option<&'a FilterPredicate>,
}
