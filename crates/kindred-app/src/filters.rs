// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use time::Date;

use crate::debounce::Debouncer;
use crate::ids::{DebounceToken, EntityId};
use crate::model::{ContentType, EntitySummary};

/// Inclusive date range. `start <= end` holds for every constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub const fn start(self) -> Date {
        self.start
    }

    pub const fn end(self) -> Date {
        self.end
    }

    pub fn contains(self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    pub search_query: String,
    pub date_range: Option<DateRange>,
    pub entity_ids: BTreeSet<EntityId>,
    pub content_types: BTreeSet<ContentType>,
}

impl FilterPredicate {
    /// Number of non-default fields: a non-blank search, a date range, and
    /// each non-empty multi-select count one apiece.
    pub fn active_filter_count(&self) -> usize {
        [
            !self.search_query.trim().is_empty(),
            self.date_range.is_some(),
            !self.entity_ids.is_empty(),
            !self.content_types.is_empty(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn is_default(&self) -> bool {
        self.active_filter_count() == 0
    }

    /// Client-side evaluation. Criteria that do not apply to the row's kind
    /// are ignored, the same way the backend query skips them.
    pub fn matches(&self, row: &EntitySummary) -> bool {
        let needle = self.search_query.trim().to_lowercase();
        if !needle.is_empty()
            && !row.title.to_lowercase().contains(&needle)
            && !row.subtitle.to_lowercase().contains(&needle)
        {
            return false;
        }

        if let Some(range) = self.date_range
            && row.kind.filters_by_date()
            && !row.date.is_some_and(|date| range.contains(date))
        {
            return false;
        }

        if !self.entity_ids.is_empty()
            && row.kind.filters_by_child()
            && !row.child_ids.iter().any(|id| self.entity_ids.contains(id))
        {
            return false;
        }

        if !self.content_types.is_empty()
            && row.kind.filters_by_content_type()
            && !row
                .content_type
                .is_some_and(|content_type| self.content_types.contains(&content_type))
        {
            return false;
        }

        true
    }
}

/// Filter state for one list view: the committed predicate plus the search
/// box's debounced raw input.
///
/// Every setter replaces its field wholesale against the current predicate
/// and reports whether anything changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    predicate: FilterPredicate,
    search_input: Debouncer,
}

impl FilterState {
    pub fn new(debounce: Duration) -> Self {
        Self::with_predicate(FilterPredicate::default(), debounce)
    }

    pub fn with_predicate(predicate: FilterPredicate, debounce: Duration) -> Self {
        Self {
            predicate,
            search_input: Debouncer::new(debounce),
        }
    }

    pub fn predicate(&self) -> &FilterPredicate {
        &self.predicate
    }

    pub fn active_filter_count(&self) -> usize {
        self.predicate.active_filter_count()
    }

    /// What the search box currently shows: pending keystrokes if any,
    /// otherwise the committed query.
    pub fn search_text(&self) -> &str {
        self.search_input
            .pending()
            .unwrap_or(self.predicate.search_query.as_str())
    }

    pub fn search_debounce(&self) -> Duration {
        self.search_input.delay()
    }

    pub fn set_search_query(&mut self, query: &str) -> bool {
        self.search_input.cancel();
        self.commit_search(query)
    }

    pub fn set_date_range(&mut self, range: Option<DateRange>) -> bool {
        replace_field(&mut self.predicate.date_range, range)
    }

    pub fn set_entity_ids(&mut self, ids: impl IntoIterator<Item = EntityId>) -> bool {
        replace_field(&mut self.predicate.entity_ids, ids.into_iter().collect())
    }

    pub fn set_content_types(&mut self, types: impl IntoIterator<Item = ContentType>) -> bool {
        replace_field(&mut self.predicate.content_types, types.into_iter().collect())
    }

    pub fn toggled_entity_ids(&self, id: &EntityId) -> BTreeSet<EntityId> {
        let mut ids = self.predicate.entity_ids.clone();
        if !ids.remove(id) {
            ids.insert(id.clone());
        }
        ids
    }

    pub fn toggled_content_types(&self, content_type: ContentType) -> BTreeSet<ContentType> {
        let mut types = self.predicate.content_types.clone();
        if !types.remove(&content_type) {
            types.insert(content_type);
        }
        types
    }

    pub fn clear(&mut self) -> bool {
        self.search_input.cancel();
        replace_field(&mut self.predicate, FilterPredicate::default())
    }

    pub fn type_search(&mut self, text: impl Into<String>, now: Instant) -> Option<DebounceToken> {
        self.search_input.input(text, now)
    }

    /// Timer callback; commits only for the most recently armed token.
    pub fn fire_search_timer(&mut self, token: DebounceToken) -> Option<bool> {
        let value = self.search_input.fire(token)?;
        Some(self.commit_search(&value))
    }

    pub fn flush_search(&mut self) -> Option<bool> {
        let value = self.search_input.flush()?;
        Some(self.commit_search(&value))
    }

    /// Drops pending keystrokes when the search box goes away.
    pub fn cancel_search_input(&mut self) -> bool {
        self.search_input.cancel()
    }

    pub fn dispose(&mut self) {
        self.search_input.dispose();
    }

    fn commit_search(&mut self, query: &str) -> bool {
        replace_field(&mut self.predicate.search_query, query.trim().to_owned())
    }
}

fn replace_field<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::{DateRange, FilterPredicate, FilterState};
    use crate::debounce::COMPACT_SEARCH_DEBOUNCE;
    use crate::{ContentType, EntityId, EntityKind, EntitySummary};
    use anyhow::{Result, anyhow};
    use std::collections::BTreeSet;
    use std::time::{Duration, Instant};
    use time::{Date, Month};

    fn id(raw: &str) -> Result<EntityId> {
        EntityId::parse(raw).ok_or_else(|| anyhow!("invalid id {raw:?}"))
    }

    fn day(value: u8) -> Result<Date> {
        Ok(Date::from_calendar_date(2026, Month::May, value)?)
    }

    #[test]
    fn date_range_rejects_inverted_bounds() -> Result<()> {
        assert!(DateRange::new(day(10)?, day(2)?).is_none());
        let range = DateRange::new(day(2)?, day(2)?).ok_or_else(|| anyhow!("same-day range"))?;
        assert!(range.contains(day(2)?));
        assert!(!range.contains(day(3)?));
        Ok(())
    }

    #[test]
    fn default_predicate_counts_zero_filters() {
        assert_eq!(FilterPredicate::default().active_filter_count(), 0);
    }

    #[test]
    fn search_and_one_child_count_two_filters() -> Result<()> {
        let predicate = FilterPredicate {
            search_query: "abc".to_owned(),
            entity_ids: BTreeSet::from([id("c1")?]),
            ..FilterPredicate::default()
        };
        assert_eq!(predicate.active_filter_count(), 2);
        Ok(())
    }

    #[test]
    fn blank_search_does_not_count() {
        let predicate = FilterPredicate {
            search_query: "   ".to_owned(),
            content_types: BTreeSet::from([ContentType::Photo, ContentType::Video]),
            ..FilterPredicate::default()
        };
        assert_eq!(predicate.active_filter_count(), 1);
    }

    #[test]
    fn consecutive_setters_keep_both_updates() -> Result<()> {
        let mut state = FilterState::new(COMPACT_SEARCH_DEBOUNCE);
        let range = DateRange::new(day(1)?, day(31)?);

        assert!(state.set_date_range(range));
        assert!(state.set_entity_ids([id("c2")?, id("c1")?, id("c2")?]));

        assert_eq!(state.predicate().date_range, range);
        assert_eq!(
            state.predicate().entity_ids,
            BTreeSet::from([id("c1")?, id("c2")?])
        );
        assert_eq!(state.active_filter_count(), 2);
        Ok(())
    }

    #[test]
    fn setting_the_same_value_reports_no_change() {
        let mut state = FilterState::new(COMPACT_SEARCH_DEBOUNCE);
        assert!(state.set_search_query("  emma "));
        assert_eq!(state.predicate().search_query, "emma");
        assert!(!state.set_search_query("emma"));
    }

    #[test]
    fn toggles_compute_a_new_set_without_mutating() -> Result<()> {
        let mut state = FilterState::new(COMPACT_SEARCH_DEBOUNCE);
        state.set_entity_ids([id("c1")?]);

        let toggled = state.toggled_entity_ids(&id("c2")?);
        assert_eq!(toggled, BTreeSet::from([id("c1")?, id("c2")?]));
        assert_eq!(state.predicate().entity_ids.len(), 1);

        let removed = state.toggled_entity_ids(&id("c1")?);
        assert!(removed.is_empty());

        let types = state.toggled_content_types(ContentType::Milestone);
        assert_eq!(types, BTreeSet::from([ContentType::Milestone]));
        Ok(())
    }

    #[test]
    fn typed_search_commits_only_through_the_latest_timer() {
        let start = Instant::now();
        let mut state = FilterState::new(COMPACT_SEARCH_DEBOUNCE);

        let stale = state.type_search("sar", start);
        let latest = state.type_search("sarah", start + Duration::from_millis(50));
        assert_eq!(state.search_text(), "sarah");
        assert_eq!(state.predicate().search_query, "");

        assert_eq!(stale.and_then(|token| state.fire_search_timer(token)), None);
        assert_eq!(
            latest.and_then(|token| state.fire_search_timer(token)),
            Some(true)
        );
        assert_eq!(state.predicate().search_query, "sarah");
    }

    #[test]
    fn clear_drops_pending_keystrokes() {
        let mut state = FilterState::new(COMPACT_SEARCH_DEBOUNCE);
        state.set_search_query("liam");
        let token = state.type_search("liam park", Instant::now());

        assert!(state.clear());
        assert_eq!(token.and_then(|token| state.fire_search_timer(token)), None);
        assert_eq!(state.search_text(), "");
        assert!(!state.clear());
    }

    #[test]
    fn matches_ignores_criteria_that_do_not_apply_to_the_kind() -> Result<()> {
        let recipient = EntitySummary {
            id: id("r1")?,
            kind: EntityKind::Recipient,
            title: "Sarah Johnson".to_owned(),
            subtitle: "Grandmother".to_owned(),
            date: None,
            child_ids: Vec::new(),
            content_type: None,
        };
        let predicate = FilterPredicate {
            search_query: "grand".to_owned(),
            date_range: DateRange::new(day(1)?, day(2)?),
            content_types: BTreeSet::from([ContentType::Photo]),
            ..FilterPredicate::default()
        };
        assert!(predicate.matches(&recipient));

        let update = EntitySummary {
            id: id("u1")?,
            kind: EntityKind::Update,
            title: "First steps".to_owned(),
            subtitle: "video".to_owned(),
            date: Some(day(20)?),
            child_ids: vec![id("c1")?],
            content_type: Some(ContentType::Video),
        };
        let by_date = FilterPredicate {
            date_range: DateRange::new(day(1)?, day(2)?),
            ..FilterPredicate::default()
        };
        assert!(!by_date.matches(&update));
        Ok(())
    }
}
