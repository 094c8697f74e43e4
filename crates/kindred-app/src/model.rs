// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use time::Date;

use crate::ids::EntityId;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Top-level dashboard section. Exactly one is active at a time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ViewId {
    #[default]
    Activity,
    Digests,
    Children,
    Recipients,
    Groups,
    Drafts,
    Settings,
    MemoryBook,
}

impl ViewId {
    pub const ALL: [Self; 8] = [
        Self::Activity,
        Self::Digests,
        Self::Children,
        Self::Recipients,
        Self::Groups,
        Self::Drafts,
        Self::Settings,
        Self::MemoryBook,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Digests => "digests",
            Self::Children => "children",
            Self::Recipients => "recipients",
            Self::Groups => "groups",
            Self::Drafts => "drafts",
            Self::Settings => "settings",
            Self::MemoryBook => "memory-book",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "activity" => Some(Self::Activity),
            "digests" => Some(Self::Digests),
            "children" => Some(Self::Children),
            "recipients" => Some(Self::Recipients),
            "groups" => Some(Self::Groups),
            "drafts" => Some(Self::Drafts),
            "settings" => Some(Self::Settings),
            "memory-book" => Some(Self::MemoryBook),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Activity => "Activity",
            Self::Digests => "Digests",
            Self::Children => "Children",
            Self::Recipients => "Recipients",
            Self::Groups => "Groups",
            Self::Drafts => "Drafts",
            Self::Settings => "Settings",
            Self::MemoryBook => "Memory Book",
        }
    }

    pub const fn entity_kind(self) -> Option<EntityKind> {
        match self {
            Self::Activity | Self::MemoryBook => Some(EntityKind::Update),
            Self::Digests => Some(EntityKind::Digest),
            Self::Children => Some(EntityKind::Child),
            Self::Recipients => Some(EntityKind::Recipient),
            Self::Groups => Some(EntityKind::Group),
            Self::Drafts => Some(EntityKind::Draft),
            Self::Settings => None,
        }
    }

    /// Views whose middle pane is a filterable list.
    pub const fn is_list(self) -> bool {
        self.entity_kind().is_some()
    }

    /// Views with a heavy feed get the longer search quiet period.
    pub const fn is_heavy(self) -> bool {
        matches!(self, Self::Activity | Self::MemoryBook)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Update,
    Digest,
    Child,
    Recipient,
    Group,
    Draft,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Digest => "digest",
            Self::Child => "child",
            Self::Recipient => "recipient",
            Self::Group => "group",
            Self::Draft => "draft",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "update" => Some(Self::Update),
            "digest" => Some(Self::Digest),
            "child" => Some(Self::Child),
            "recipient" => Some(Self::Recipient),
            "group" => Some(Self::Group),
            "draft" => Some(Self::Draft),
            _ => None,
        }
    }

    pub const fn filters_by_date(self) -> bool {
        matches!(self, Self::Update | Self::Digest | Self::Draft)
    }

    pub const fn filters_by_child(self) -> bool {
        matches!(self, Self::Update | Self::Child | Self::Draft)
    }

    pub const fn filters_by_content_type(self) -> bool {
        matches!(self, Self::Update | Self::Draft)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Photo,
    Video,
    Audio,
    Milestone,
}

impl ContentType {
    pub const ALL: [Self; 5] = [
        Self::Text,
        Self::Photo,
        Self::Video,
        Self::Audio,
        Self::Milestone,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Milestone => "milestone",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "photo" => Some(Self::Photo),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "milestone" => Some(Self::Milestone),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestStatus {
    Draft,
    Ready,
    Sent,
}

impl DigestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Sent => "sent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "ready" => Some(Self::Ready),
            "sent" => Some(Self::Sent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    EveryUpdate,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EveryUpdate => "every_update",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "every_update" => Some(Self::EveryUpdate),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub id: EntityId,
    pub body: String,
    pub content_type: ContentType,
    pub child_ids: Vec<EntityId>,
    #[serde(with = "iso_date")]
    pub created_on: Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub id: EntityId,
    pub title: String,
    pub status: DigestStatus,
    #[serde(with = "iso_date")]
    pub period_start: Date,
    #[serde(with = "iso_date")]
    pub period_end: Date,
    pub update_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub id: EntityId,
    pub name: String,
    #[serde(with = "iso_date::option", default)]
    pub birth_date: Option<Date>,
    pub update_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub relationship: String,
    pub group_id: Option<EntityId>,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    pub name: String,
    pub frequency: Frequency,
    pub member_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: EntityId,
    pub title: String,
    pub body: String,
    pub content_type: ContentType,
    pub child_ids: Vec<EntityId>,
    #[serde(with = "iso_date")]
    pub updated_on: Date,
}

/// A fully loaded record, as shown by a detail panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Update(Update),
    Digest(Digest),
    Child(Child),
    Recipient(Recipient),
    Group(Group),
    Draft(Draft),
}

impl Entity {
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Update(update) => &update.id,
            Self::Digest(digest) => &digest.id,
            Self::Child(child) => &child.id,
            Self::Recipient(recipient) => &recipient.id,
            Self::Group(group) => &group.id,
            Self::Draft(draft) => &draft.id,
        }
    }

    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Update(_) => EntityKind::Update,
            Self::Digest(_) => EntityKind::Digest,
            Self::Child(_) => EntityKind::Child,
            Self::Recipient(_) => EntityKind::Recipient,
            Self::Group(_) => EntityKind::Group,
            Self::Draft(_) => EntityKind::Draft,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Update(update) => headline(&update.body),
            Self::Digest(digest) => digest.title.clone(),
            Self::Child(child) => child.name.clone(),
            Self::Recipient(recipient) => recipient.name.clone(),
            Self::Group(group) => group.name.clone(),
            Self::Draft(draft) => draft.title.clone(),
        }
    }

    pub fn summary(&self) -> EntitySummary {
        let (subtitle, date, child_ids, content_type) = match self {
            Self::Update(update) => (
                update.content_type.as_str().to_owned(),
                Some(update.created_on),
                update.child_ids.clone(),
                Some(update.content_type),
            ),
            Self::Digest(digest) => (
                format!("{} · {} updates", digest.status.as_str(), digest.update_count),
                Some(digest.period_end),
                Vec::new(),
                None,
            ),
            Self::Child(child) => (
                format!("{} updates", child.update_count),
                child.birth_date,
                vec![child.id.clone()],
                None,
            ),
            Self::Recipient(recipient) => {
                (recipient.relationship.clone(), None, Vec::new(), None)
            }
            Self::Group(group) => (
                format!("{} members", group.member_count),
                None,
                Vec::new(),
                None,
            ),
            Self::Draft(draft) => (
                draft.content_type.as_str().to_owned(),
                Some(draft.updated_on),
                draft.child_ids.clone(),
                Some(draft.content_type),
            ),
        };

        EntitySummary {
            id: self.id().clone(),
            kind: self.kind(),
            title: self.title(),
            subtitle,
            date,
            child_ids,
            content_type,
        }
    }
}

/// One row of a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub kind: EntityKind,
    pub title: String,
    pub subtitle: String,
    #[serde(with = "iso_date::option", default)]
    pub date: Option<Date>,
    pub child_ids: Vec<EntityId>,
    pub content_type: Option<ContentType>,
}

const HEADLINE_CHARS: usize = 60;

fn headline(body: &str) -> String {
    let first_line = body.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= HEADLINE_CHARS {
        return first_line.to_owned();
    }
    let truncated: String = first_line.chars().take(HEADLINE_CHARS - 1).collect();
    format!("{}…", truncated.trim_end())
}
