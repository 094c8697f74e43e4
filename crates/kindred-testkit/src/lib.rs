// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use kindred_app::{
    Child, ContentType, DataService, Digest, DigestStatus, Draft, Entity, EntityId, EntityKind,
    EntitySummary, FetchError, FilterPredicate, Frequency, Group, Recipient, Update,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use time::macros::date;
use time::{Date, Duration};

const UPDATE_OPENERS: [&str; 8] = [
    "First trip to the",
    "Rainy afternoon at the",
    "Big news from the",
    "Picnic by the",
    "Muddy boots after the",
    "Sleepy morning at the",
    "Birthday cake at the",
    "Long walk around the",
];

const UPDATE_PLACES: [&str; 8] = [
    "park", "beach", "library", "farm", "lake", "zoo", "garden", "museum",
];

pub fn entity_id(raw: &str) -> Result<EntityId> {
    EntityId::parse(raw).ok_or_else(|| anyhow!("invalid fixture id {raw:?}"))
}

pub fn fixture_today() -> Date {
    date!(2026 - 05 - 31)
}

/// The fixed family used across tests and the demo: two children, two
/// recipients in two groups, a couple of digests, a draft, and a handful of
/// updates.
pub fn seeded_entities() -> Result<Vec<Entity>> {
    let emma = entity_id("c1")?;
    let liam = entity_id("c2")?;
    let grandparents = entity_id("g1")?;
    let friends = entity_id("g2")?;

    Ok(vec![
        Entity::Child(Child {
            id: emma.clone(),
            name: "Emma".to_owned(),
            birth_date: Some(date!(2023 - 03 - 14)),
            update_count: 3,
        }),
        Entity::Child(Child {
            id: liam.clone(),
            name: "Liam".to_owned(),
            birth_date: Some(date!(2025 - 01 - 09)),
            update_count: 2,
        }),
        Entity::Recipient(Recipient {
            id: entity_id("r1")?,
            name: "Sarah Johnson".to_owned(),
            email: "sarah.johnson@example.com".to_owned(),
            relationship: "Grandmother".to_owned(),
            group_id: Some(grandparents.clone()),
            frequency: Frequency::Weekly,
        }),
        Entity::Recipient(Recipient {
            id: entity_id("r2")?,
            name: "Michael Chen".to_owned(),
            email: "michael.chen@example.com".to_owned(),
            relationship: "Family friend".to_owned(),
            group_id: Some(friends.clone()),
            frequency: Frequency::Monthly,
        }),
        Entity::Group(Group {
            id: grandparents,
            name: "Grandparents".to_owned(),
            frequency: Frequency::Weekly,
            member_count: 1,
        }),
        Entity::Group(Group {
            id: friends,
            name: "Close Friends".to_owned(),
            frequency: Frequency::Monthly,
            member_count: 1,
        }),
        Entity::Digest(Digest {
            id: entity_id("d1")?,
            title: "April highlights".to_owned(),
            status: DigestStatus::Sent,
            period_start: date!(2026 - 04 - 01),
            period_end: date!(2026 - 04 - 30),
            update_count: 2,
        }),
        Entity::Digest(Digest {
            id: entity_id("d2")?,
            title: "May so far".to_owned(),
            status: DigestStatus::Draft,
            period_start: date!(2026 - 05 - 01),
            period_end: date!(2026 - 05 - 31),
            update_count: 3,
        }),
        Entity::Draft(Draft {
            id: entity_id("dr1")?,
            title: "Swim lessons".to_owned(),
            body: "Emma floated on her own today!".to_owned(),
            content_type: ContentType::Video,
            child_ids: vec![emma.clone()],
            updated_on: date!(2026 - 05 - 29),
        }),
        Entity::Update(Update {
            id: entity_id("u1")?,
            body: "First steps in the kitchen\nLiam made it three whole steps.".to_owned(),
            content_type: ContentType::Milestone,
            child_ids: vec![liam.clone()],
            created_on: date!(2026 - 04 - 12),
        }),
        Entity::Update(Update {
            id: entity_id("u2")?,
            body: "Beach day with both kids".to_owned(),
            content_type: ContentType::Photo,
            child_ids: vec![emma.clone(), liam.clone()],
            created_on: date!(2026 - 04 - 26),
        }),
        Entity::Update(Update {
            id: entity_id("u3")?,
            body: "Emma sang the whole alphabet song".to_owned(),
            content_type: ContentType::Audio,
            child_ids: vec![emma.clone()],
            created_on: date!(2026 - 05 - 03),
        }),
        Entity::Update(Update {
            id: entity_id("u4")?,
            body: "Park trip after nap time".to_owned(),
            content_type: ContentType::Video,
            child_ids: vec![emma, liam],
            created_on: date!(2026 - 05 - 20),
        }),
    ])
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for bulk updates, for lists long enough to exercise
/// search and date filtering.
#[derive(Debug, Clone)]
pub struct FamilyFaker {
    rng: DeterministicRng,
}

impl FamilyFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    /// One update dated within the 90 days before `fixture_today`, tagged
    /// with a non-empty subset of `children`.
    pub fn update(&mut self, id: EntityId, children: &[EntityId]) -> Update {
        let opener = self.pick(&UPDATE_OPENERS);
        let place = self.pick(&UPDATE_PLACES);
        let content_type = ContentType::ALL[self.rng.int_n(ContentType::ALL.len())];
        let days_ago = self.rng.int_n(90) as i64;

        let mut child_ids: Vec<EntityId> = children
            .iter()
            .filter(|_| self.rng.int_n(2) == 1)
            .cloned()
            .collect();
        if child_ids.is_empty()
            && let Some(first) = children.first()
        {
            child_ids.push(first.clone());
        }

        Update {
            id,
            body: format!("{opener} {place}"),
            content_type,
            child_ids,
            created_on: fixture_today() - Duration::days(days_ago),
        }
    }

    pub fn updates(&mut self, count: usize, children: &[EntityId]) -> Result<Vec<Update>> {
        (1..=count)
            .map(|index| Ok(self.update(entity_id(&format!("gen-{index}"))?, children)))
            .collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// One call observed by `FakeService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Get { kind: EntityKind, id: EntityId },
    Query {
        kind: EntityKind,
        predicate: FilterPredicate,
    },
}

#[derive(Debug, Default)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn wait(&self) {
        let mut open = lock(&self.open);
        while !*open {
            open = self
                .opened
                .wait(open)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self) {
        *lock(&self.open) = true;
        self.opened.notify_all();
    }
}

/// Holds every `get_entity` call for one id until released. Dropping the
/// handle releases too, so a failing test never leaves workers parked.
#[derive(Debug)]
pub struct GateHandle {
    gate: Arc<Gate>,
}

impl GateHandle {
    pub fn release(&self) {
        self.gate.release();
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[derive(Debug, Default)]
struct FakeState {
    entities: Vec<Entity>,
    gates: HashMap<EntityId, Arc<Gate>>,
    failures: VecDeque<FetchError>,
    calls: Vec<ServiceCall>,
}

/// In-memory `DataService` with scripted failures and per-id gates.
#[derive(Debug, Default)]
pub struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                entities,
                ..FakeState::default()
            }),
        }
    }

    pub fn seeded() -> Result<Self> {
        Ok(Self::new(seeded_entities()?))
    }

    pub fn insert(&self, entity: Entity) {
        lock(&self.state).entities.push(entity);
    }

    pub fn hold(&self, id: &EntityId) -> GateHandle {
        let gate = Arc::new(Gate::default());
        lock(&self.state)
            .gates
            .insert(id.clone(), Arc::clone(&gate));
        GateHandle { gate }
    }

    /// The next call of either kind fails with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, error: FetchError) {
        lock(&self.state).failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        lock(&self.state).calls.clone()
    }

    pub fn query_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| matches!(call, ServiceCall::Query { .. }))
            .count()
    }

    pub fn get_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| matches!(call, ServiceCall::Get { .. }))
            .count()
    }
}

impl DataService for FakeService {
    fn get_entity(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, FetchError> {
        let gate = {
            let mut state = lock(&self.state);
            state.calls.push(ServiceCall::Get {
                kind,
                id: id.clone(),
            });
            state.gates.get(id).cloned()
        };
        if let Some(gate) = gate {
            gate.wait();
        }

        let mut state = lock(&self.state);
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        state
            .entities
            .iter()
            .find(|entity| entity.kind() == kind && entity.id() == id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                kind,
                id: id.clone(),
            })
    }

    fn query_entities(
        &self,
        kind: EntityKind,
        predicate: &FilterPredicate,
    ) -> Result<Vec<EntitySummary>, FetchError> {
        let mut state = lock(&self.state);
        state.calls.push(ServiceCall::Query {
            kind,
            predicate: predicate.clone(),
        });
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }

        let mut rows: Vec<EntitySummary> = state
            .entities
            .iter()
            .filter(|entity| entity.kind() == kind)
            .map(Entity::summary)
            .filter(|row| predicate.matches(row))
            .collect();
        rows.sort_by(|left, right| {
            right
                .date
                .cmp(&left.date)
                .then_with(|| left.title.cmp(&right.title))
        });
        Ok(rows)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
