// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::filters::FilterPredicate;
use crate::ids::EntityId;
use crate::model::{Entity, EntityKind, EntitySummary};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The id no longer resolves (deleted or not visible to this account).
    #[error("could not find {kind} {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    /// Network or backend failure; retrying the same request may succeed.
    #[error("request failed: {message}")]
    Transient { message: String },
}

impl FetchError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read-only data access used by list and detail panels. Implementations are
/// called from worker threads.
pub trait DataService: Send + Sync {
    fn get_entity(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, FetchError>;

    fn query_entities(
        &self,
        kind: EntityKind,
        predicate: &FilterPredicate,
    ) -> Result<Vec<EntitySummary>, FetchError>;
}
