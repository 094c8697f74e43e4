// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, warn};

use crate::filters::FilterPredicate;
use crate::ids::{EntityId, Ticket};
use crate::model::{Entity, EntityKind, EntitySummary};
use crate::service::FetchError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Generation counter for one panel's requests. Only the ticket handed out
/// last is current; anything older is a stale response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSequencer {
    current: Ticket,
}

impl RequestSequencer {
    pub fn begin(&mut self) -> Ticket {
        self.current = self.current.next();
        self.current
    }

    /// Makes every outstanding ticket stale without starting a request.
    pub fn invalidate(&mut self) {
        self.current = self.current.next();
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current == ticket
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max: u32,
    used: u32,
}

impl RetryBudget {
    pub const fn new(max: u32) -> Self {
        Self { max, used: 0 }
    }

    pub const fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.used)
    }

    pub fn try_consume(&mut self) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    Idle,
    Loading { ticket: Ticket },
    Loaded(T),
    Failed { error: FetchError, retries_left: u32 },
    /// Retries are used up; the user is pointed at a page reload.
    ReloadRequired { error: FetchError },
}

impl<T> LoadState<T> {
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub const fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub const fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Failed { error, .. } | Self::ReloadRequired { error } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub ticket: Ticket,
    pub kind: EntityKind,
    pub id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub ticket: Ticket,
    pub kind: EntityKind,
    pub predicate: FilterPredicate,
}

/// Right-pane detail consumer: loads one entity for the current selection.
/// `Idle` with no selection is the empty-selection placeholder; a `None`
/// selection never turns into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPanel {
    target: Option<(EntityKind, EntityId)>,
    sequencer: RequestSequencer,
    budget: RetryBudget,
    state: LoadState<Entity>,
}

impl DetailPanel {
    pub fn new(max_retries: u32) -> Self {
        Self {
            target: None,
            sequencer: RequestSequencer::default(),
            budget: RetryBudget::new(max_retries),
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> &LoadState<Entity> {
        &self.state
    }

    pub fn selection(&self) -> Option<&EntityId> {
        self.target.as_ref().map(|(_, id)| id)
    }

    pub fn show(&mut self, kind: EntityKind, id: EntityId) -> DetailRequest {
        self.budget.reset();
        self.target = Some((kind, id.clone()));
        self.issue(kind, id)
    }

    /// Unmounts the panel content: back to the placeholder, and anything in
    /// flight becomes stale.
    pub fn clear(&mut self) {
        self.target = None;
        self.sequencer.invalidate();
        self.budget.reset();
        self.state = LoadState::Idle;
    }

    /// Re-requests the same id. Only valid after a failure with budget left.
    pub fn retry(&mut self) -> Option<DetailRequest> {
        if !matches!(self.state, LoadState::Failed { .. }) {
            return None;
        }
        let (kind, id) = self.target.clone()?;
        if !self.budget.try_consume() {
            return None;
        }
        Some(self.issue(kind, id))
    }

    pub fn complete(&mut self, ticket: Ticket, result: Result<Entity, FetchError>) -> Completion {
        if !self.sequencer.is_current(ticket) {
            debug!(ticket = ticket.get(), "discarding stale detail response");
            return Completion::Stale;
        }
        self.state = settle(result, &self.budget, "detail");
        if self.state.loaded().is_some() {
            self.budget.reset();
        }
        Completion::Applied
    }

    fn issue(&mut self, kind: EntityKind, id: EntityId) -> DetailRequest {
        let ticket = self.sequencer.begin();
        self.state = LoadState::Loading { ticket };
        DetailRequest { ticket, kind, id }
    }
}

/// Middle-pane list consumer: loads rows for the committed predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPanel {
    query: Option<(EntityKind, FilterPredicate)>,
    sequencer: RequestSequencer,
    budget: RetryBudget,
    state: LoadState<Vec<EntitySummary>>,
}

impl ListPanel {
    pub fn new(max_retries: u32) -> Self {
        Self {
            query: None,
            sequencer: RequestSequencer::default(),
            budget: RetryBudget::new(max_retries),
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> &LoadState<Vec<EntitySummary>> {
        &self.state
    }

    pub fn predicate(&self) -> Option<&FilterPredicate> {
        self.query.as_ref().map(|(_, predicate)| predicate)
    }

    pub fn load(&mut self, kind: EntityKind, predicate: FilterPredicate) -> ListRequest {
        self.budget.reset();
        self.query = Some((kind, predicate.clone()));
        self.issue(kind, predicate)
    }

    pub fn clear(&mut self) {
        self.query = None;
        self.sequencer.invalidate();
        self.budget.reset();
        self.state = LoadState::Idle;
    }

    pub fn retry(&mut self) -> Option<ListRequest> {
        if !matches!(self.state, LoadState::Failed { .. }) {
            return None;
        }
        let (kind, predicate) = self.query.clone()?;
        if !self.budget.try_consume() {
            return None;
        }
        Some(self.issue(kind, predicate))
    }

    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<EntitySummary>, FetchError>,
    ) -> Completion {
        if !self.sequencer.is_current(ticket) {
            debug!(ticket = ticket.get(), "discarding stale list response");
            return Completion::Stale;
        }
        self.state = settle(result, &self.budget, "list");
        if self.state.loaded().is_some() {
            self.budget.reset();
        }
        Completion::Applied
    }

    fn issue(&mut self, kind: EntityKind, predicate: FilterPredicate) -> ListRequest {
        let ticket = self.sequencer.begin();
        self.state = LoadState::Loading { ticket };
        ListRequest {
            ticket,
            kind,
            predicate,
        }
    }
}

fn settle<T>(result: Result<T, FetchError>, budget: &RetryBudget, panel: &str) -> LoadState<T> {
    match result {
        Ok(value) => LoadState::Loaded(value),
        Err(error) if budget.remaining() == 0 => {
            warn!(panel, %error, "retries exhausted; reload required");
            LoadState::ReloadRequired { error }
        }
        Err(error) => {
            warn!(panel, %error, retries_left = budget.remaining(), "load failed");
            LoadState::Failed {
                retries_left: budget.remaining(),
                error,
            }
        }
    }
}
