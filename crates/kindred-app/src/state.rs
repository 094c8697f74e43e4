// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::debounce::{COMPACT_SEARCH_DEBOUNCE, HEAVY_SEARCH_DEBOUNCE};
use crate::fetch::DEFAULT_MAX_RETRIES;
use crate::filters::{DateRange, FilterPredicate, FilterState};
use crate::ids::{DebounceToken, EntityId, MountId, SubscriptionId};
use crate::location::{DashboardLocation, format_url};
use crate::model::{ContentType, ViewId};
use crate::navigation::Navigation;
use crate::router::{RightPaneProps, route, route_segment};
use crate::selection::SelectionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    pub initial_view: ViewId,
    pub search_debounce: Duration,
    pub heavy_search_debounce: Duration,
    pub max_retries: u32,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            initial_view: ViewId::Activity,
            search_debounce: COMPACT_SEARCH_DEBOUNCE,
            heavy_search_debounce: HEAVY_SEARCH_DEBOUNCE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl DashboardOptions {
    pub fn debounce_for(&self, view: ViewId) -> Duration {
        if view.is_heavy() {
            self.heavy_search_debounce
        } else {
            self.search_debounce
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    Navigate(ViewId),
    Select(EntityId),
    ClearSelection,
    SetSearchQuery(String),
    SetDateRange(Option<DateRange>),
    SetEntityIds(Vec<EntityId>),
    SetContentTypes(Vec<ContentType>),
    ToggleEntityId(EntityId),
    ToggleContentType(ContentType),
    ClearFilters,
    TypeSearch { text: String, at: Instant },
    SearchTimerFired { view: ViewId, token: DebounceToken },
    FlushSearch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    SelectionCleared {
        view: ViewId,
        id: EntityId,
    },
    ViewChanged {
        from: ViewId,
        to: ViewId,
        mount: MountId,
    },
    SelectionChanged {
        view: ViewId,
        id: EntityId,
    },
    FiltersChanged {
        view: ViewId,
        predicate: FilterPredicate,
    },
    UrlReplaced(String),
    SearchTimerArmed {
        view: ViewId,
        token: DebounceToken,
        delay: Duration,
    },
}

type Listener = Box<dyn FnMut(&DashboardEvent)>;

#[derive(Default)]
struct Listeners {
    last_id: SubscriptionId,
    entries: Vec<(SubscriptionId, Listener)>,
}

impl Listeners {
    fn add(&mut self, listener: Listener) -> SubscriptionId {
        self.last_id = self.last_id.next();
        self.entries.push((self.last_id, listener));
        self.last_id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    fn notify(&mut self, events: &[DashboardEvent]) {
        for event in events {
            for (_, listener) in &mut self.entries {
                listener(event);
            }
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// The three-pane coordination state: active view, cross-pane selection, and
/// one filter state per list view, mirrored into a shareable URL.
///
/// All mutation goes through `dispatch`, which returns the resulting events
/// in order and also hands them to every subscriber. A view change always
/// emits `SelectionCleared` (when something was selected) before
/// `ViewChanged`.
#[derive(Debug)]
pub struct Dashboard {
    options: DashboardOptions,
    navigation: Navigation,
    selection: SelectionStore,
    filters: BTreeMap<ViewId, FilterState>,
    unknown_segment: Option<String>,
    mount: MountId,
    url: String,
    listeners: Listeners,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(DashboardOptions::default())
    }
}

impl Dashboard {
    pub fn new(options: DashboardOptions) -> Self {
        let view = options.initial_view;
        let filters = ViewId::ALL
            .into_iter()
            .filter(|view| view.is_list())
            .map(|view| (view, FilterState::new(options.debounce_for(view))))
            .collect();

        let mut dashboard = Self {
            options,
            navigation: Navigation::new(view),
            selection: SelectionStore::new(view),
            filters,
            unknown_segment: None,
            mount: MountId::default(),
            url: String::new(),
            listeners: Listeners::default(),
        };
        dashboard.url = dashboard.canonical_url();
        dashboard
    }

    /// Restores navigation and the active view's filters from a dashboard
    /// URL. Malformed parameters fall back to defaults. An unrecognized view
    /// segment keeps the initial view for navigation but routes the right
    /// pane to the placeholder until the next navigation.
    pub fn from_url(raw: &str, options: DashboardOptions) -> Self {
        let location = DashboardLocation::parse(raw);
        let view = location.view().unwrap_or(options.initial_view);

        let mut dashboard = Self::new(DashboardOptions {
            initial_view: view,
            ..options
        });
        dashboard.options = options;

        if let Some(state) = dashboard.filters.get_mut(&view) {
            *state = FilterState::with_predicate(location.predicate.clone(), options.debounce_for(view));
        }
        if location.is_unknown_view() {
            dashboard.unknown_segment = location.segment;
        }
        dashboard.url = dashboard.canonical_url();
        debug!(url = %dashboard.url, view = %view, "dashboard restored from url");
        dashboard
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    pub fn active_view(&self) -> ViewId {
        self.navigation.active_view()
    }

    pub fn selected_id(&self) -> Option<&EntityId> {
        self.selection.selected_for(self.active_view())
    }

    pub fn filters(&self, view: ViewId) -> Option<&FilterState> {
        self.filters.get(&view)
    }

    pub fn active_filters(&self) -> Option<&FilterState> {
        self.filters(self.active_view())
    }

    pub fn active_filter_count(&self) -> usize {
        self.active_filters()
            .map(FilterState::active_filter_count)
            .unwrap_or(0)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mount(&self) -> MountId {
        self.mount
    }

    pub fn right_pane(&self) -> RightPaneProps<'_> {
        let view = self.active_view();
        let pane = match &self.unknown_segment {
            Some(segment) => route_segment(segment),
            None => route(view),
        };
        RightPaneProps {
            view,
            pane,
            mount: self.mount,
            selection: self.selected_id(),
            filters: self.active_filters().map(FilterState::predicate),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&DashboardEvent) + 'static) -> SubscriptionId {
        self.listeners.add(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    pub fn dispatch(&mut self, command: DashboardCommand) -> Vec<DashboardEvent> {
        let events = self.apply(command);
        self.listeners.notify(&events);
        events
    }

    pub fn set_active_view(&mut self, view: ViewId) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::Navigate(view))
    }

    pub fn set_selected_id(&mut self, id: EntityId) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::Select(id))
    }

    pub fn clear_selection(&mut self) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::ClearSelection)
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::SetSearchQuery(query.into()))
    }

    pub fn set_date_range(&mut self, range: Option<DateRange>) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::SetDateRange(range))
    }

    pub fn set_entity_ids(&mut self, ids: Vec<EntityId>) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::SetEntityIds(ids))
    }

    pub fn set_content_types(&mut self, types: Vec<ContentType>) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::SetContentTypes(types))
    }

    pub fn toggle_entity_id(&mut self, id: EntityId) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::ToggleEntityId(id))
    }

    pub fn toggle_content_type(&mut self, content_type: ContentType) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::ToggleContentType(content_type))
    }

    pub fn clear_filters(&mut self) -> Vec<DashboardEvent> {
        self.dispatch(DashboardCommand::ClearFilters)
    }

    /// Stops every search timer for good. Late timer callbacks are ignored.
    pub fn dispose(&mut self) {
        for state in self.filters.values_mut() {
            state.dispose();
        }
    }

    fn apply(&mut self, command: DashboardCommand) -> Vec<DashboardEvent> {
        match command {
            DashboardCommand::Navigate(view) => self.navigate(view),
            DashboardCommand::Select(id) => {
                let view = self.active_view();
                if !self.selection.set_selected_id(id.clone()) {
                    return Vec::new();
                }
                debug!(view = %view, id = %id, "selection changed");
                vec![DashboardEvent::SelectionChanged { view, id }]
            }
            DashboardCommand::ClearSelection => {
                let view = self.active_view();
                self.selection
                    .clear_selection()
                    .map(|id| DashboardEvent::SelectionCleared { view, id })
                    .into_iter()
                    .collect()
            }
            DashboardCommand::SetSearchQuery(query) => {
                self.update_filters(|state| state.set_search_query(&query))
            }
            DashboardCommand::SetDateRange(range) => {
                self.update_filters(|state| state.set_date_range(range))
            }
            DashboardCommand::SetEntityIds(ids) => {
                self.update_filters(|state| state.set_entity_ids(ids))
            }
            DashboardCommand::SetContentTypes(types) => {
                self.update_filters(|state| state.set_content_types(types))
            }
            DashboardCommand::ToggleEntityId(id) => {
                self.update_filters(|state| state.set_entity_ids(state.toggled_entity_ids(&id)))
            }
            DashboardCommand::ToggleContentType(content_type) => self.update_filters(|state| {
                state.set_content_types(state.toggled_content_types(content_type))
            }),
            DashboardCommand::ClearFilters => self.update_filters(FilterState::clear),
            DashboardCommand::TypeSearch { text, at } => {
                let view = self.active_view();
                let Some(state) = self.filters.get_mut(&view) else {
                    return Vec::new();
                };
                let delay = state.search_debounce();
                state
                    .type_search(text, at)
                    .map(|token| DashboardEvent::SearchTimerArmed { view, token, delay })
                    .into_iter()
                    .collect()
            }
            DashboardCommand::SearchTimerFired { view, token } => {
                let fired = self
                    .filters
                    .get_mut(&view)
                    .and_then(|state| state.fire_search_timer(token));
                match fired {
                    Some(changed) => self.after_filter_update(view, changed),
                    None => Vec::new(),
                }
            }
            DashboardCommand::FlushSearch => {
                let view = self.active_view();
                let flushed = self
                    .filters
                    .get_mut(&view)
                    .and_then(FilterState::flush_search);
                match flushed {
                    Some(changed) => self.after_filter_update(view, changed),
                    None => Vec::new(),
                }
            }
        }
    }

    fn navigate(&mut self, view: ViewId) -> Vec<DashboardEvent> {
        let from = self.active_view();
        let leaving_unknown = self.unknown_segment.take().is_some();
        if self.navigation.set_active_view(view).is_none() && !leaving_unknown {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(id) = self.selection.rescope(view) {
            events.push(DashboardEvent::SelectionCleared { view: from, id });
        }
        if let Some(state) = self.filters.get_mut(&from) {
            state.cancel_search_input();
        }

        self.mount = self.mount.next();
        debug!(from = %from, to = %view, mount = self.mount.get(), "view changed");
        events.push(DashboardEvent::ViewChanged {
            from,
            to: view,
            mount: self.mount,
        });
        events.push(self.replace_url());
        events
    }

    fn update_filters(&mut self, update: impl FnOnce(&mut FilterState) -> bool) -> Vec<DashboardEvent> {
        let view = self.active_view();
        let Some(state) = self.filters.get_mut(&view) else {
            return Vec::new();
        };
        let changed = update(state);
        self.after_filter_update(view, changed)
    }

    fn after_filter_update(&mut self, view: ViewId, changed: bool) -> Vec<DashboardEvent> {
        let mut events = Vec::new();
        if changed && let Some(state) = self.filters.get(&view) {
            debug!(
                view = %view,
                active_filters = state.active_filter_count(),
                "filters changed"
            );
            events.push(DashboardEvent::FiltersChanged {
                view,
                predicate: state.predicate().clone(),
            });
        }
        events.push(self.replace_url());
        events
    }

    fn replace_url(&mut self) -> DashboardEvent {
        self.url = self.canonical_url();
        debug!(url = %self.url, "url replaced");
        DashboardEvent::UrlReplaced(self.url.clone())
    }

    fn canonical_url(&self) -> String {
        let view = self.active_view();
        let segment = self.unknown_segment.as_deref().unwrap_or(view.as_str());
        let default_predicate = FilterPredicate::default();
        let predicate = self
            .filters
            .get(&view)
            .map(FilterState::predicate)
            .unwrap_or(&default_predicate);
        format_url(segment, predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::{Dashboard, DashboardCommand, DashboardEvent, DashboardOptions};
    use crate::{ContentType, DateRange, EntityId, MountId, RightPane, ViewId};
    use anyhow::{Result, anyhow};
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;
    use std::time::{Duration, Instant};
    use time::{Date, Month};

    fn id(raw: &str) -> Result<EntityId> {
        EntityId::parse(raw).ok_or_else(|| anyhow!("invalid id {raw:?}"))
    }

    #[test]
    fn switching_views_always_clears_the_selection() -> Result<()> {
        for first in ViewId::ALL {
            for second in ViewId::ALL.into_iter().filter(|view| *view != first) {
                let mut dashboard = Dashboard::default();
                dashboard.set_active_view(first);
                dashboard.set_selected_id(id("x1")?);
                dashboard.set_active_view(second);
                assert_eq!(dashboard.selected_id(), None, "{first} -> {second}");
            }
        }
        Ok(())
    }

    #[test]
    fn selection_is_cleared_before_the_view_change_is_announced() -> Result<()> {
        let mut dashboard = Dashboard::default();
        dashboard.set_active_view(ViewId::Recipients);
        dashboard.set_selected_id(id("r1")?);

        let events = dashboard.set_active_view(ViewId::Drafts);
        assert_eq!(
            events,
            vec![
                DashboardEvent::SelectionCleared {
                    view: ViewId::Recipients,
                    id: id("r1")?,
                },
                DashboardEvent::ViewChanged {
                    from: ViewId::Recipients,
                    to: ViewId::Drafts,
                    mount: MountId::new(2),
                },
                DashboardEvent::UrlReplaced("/dashboard/drafts".to_owned()),
            ]
        );
        Ok(())
    }

    #[test]
    fn renavigating_to_the_active_view_keeps_the_selection() -> Result<()> {
        let mut dashboard = Dashboard::default();
        dashboard.set_active_view(ViewId::Groups);
        dashboard.set_selected_id(id("g1")?);

        assert!(dashboard.set_active_view(ViewId::Groups).is_empty());
        assert_eq!(dashboard.selected_id(), Some(&id("g1")?));
        Ok(())
    }

    #[test]
    fn explicit_deselect_reports_the_cleared_id() -> Result<()> {
        let mut dashboard = Dashboard::default();
        dashboard.set_selected_id(id("u1")?);
        assert_eq!(
            dashboard.clear_selection(),
            vec![DashboardEvent::SelectionCleared {
                view: ViewId::Activity,
                id: id("u1")?,
            }]
        );
        assert!(dashboard.clear_selection().is_empty());
        Ok(())
    }

    #[test]
    fn every_filter_setter_rewrites_the_url() -> Result<()> {
        let mut dashboard = Dashboard::default();

        dashboard.set_search_query("park");
        assert_eq!(dashboard.url(), "/dashboard/activity?q=park");

        dashboard.set_date_range(DateRange::new(
            Date::from_calendar_date(2026, Month::April, 1)?,
            Date::from_calendar_date(2026, Month::April, 30)?,
        ));
        dashboard.set_entity_ids(vec![id("c1")?]);
        dashboard.set_content_types(vec![ContentType::Photo]);

        assert_eq!(
            dashboard.url(),
            "/dashboard/activity?q=park&from=2026-04-01&to=2026-04-30&children=c1&types=photo"
        );
        assert_eq!(dashboard.active_filter_count(), 4);
        Ok(())
    }

    #[test]
    fn unchanged_setter_still_rewrites_url_without_a_filter_event() {
        let mut dashboard = Dashboard::default();
        let events = dashboard.set_search_query("");
        assert_eq!(
            events,
            vec![DashboardEvent::UrlReplaced("/dashboard/activity".to_owned())]
        );
    }

    #[test]
    fn clear_filters_is_idempotent() -> Result<()> {
        let mut dashboard = Dashboard::default();
        dashboard.set_search_query("beach");
        dashboard.set_entity_ids(vec![id("c2")?]);

        dashboard.clear_filters();
        let first_url = dashboard.url().to_owned();
        let first_state = dashboard.active_filters().cloned();

        dashboard.clear_filters();
        assert_eq!(dashboard.url(), first_url);
        assert_eq!(dashboard.active_filters().cloned(), first_state);
        assert_eq!(dashboard.active_filter_count(), 0);
        assert_eq!(first_url, "/dashboard/activity");
        Ok(())
    }

    #[test]
    fn filters_are_kept_per_view() -> Result<()> {
        let mut dashboard = Dashboard::default();
        dashboard.set_search_query("birthday");
        dashboard.set_active_view(ViewId::Recipients);
        assert_eq!(dashboard.url(), "/dashboard/recipients");
        assert_eq!(dashboard.active_filter_count(), 0);

        dashboard.set_active_view(ViewId::Activity);
        assert_eq!(dashboard.url(), "/dashboard/activity?q=birthday");
        Ok(())
    }

    #[test]
    fn toggles_funnel_through_the_wholesale_setters() -> Result<()> {
        let mut dashboard = Dashboard::default();
        dashboard.dispatch(DashboardCommand::ToggleEntityId(id("c1")?));
        dashboard.dispatch(DashboardCommand::ToggleEntityId(id("c2")?));
        dashboard.dispatch(DashboardCommand::ToggleEntityId(id("c1")?));
        dashboard.dispatch(DashboardCommand::ToggleContentType(ContentType::Video));

        let predicate = dashboard
            .active_filters()
            .map(|state| state.predicate().clone())
            .ok_or_else(|| anyhow!("activity has filters"))?;
        assert_eq!(predicate.entity_ids, BTreeSet::from([id("c2")?]));
        assert_eq!(
            predicate.content_types,
            BTreeSet::from([ContentType::Video])
        );
        Ok(())
    }

    #[test]
    fn settings_ignores_filter_commands() {
        let mut dashboard = Dashboard::default();
        dashboard.set_active_view(ViewId::Settings);
        assert!(dashboard.set_search_query("anything").is_empty());
        assert!(
            dashboard
                .dispatch(DashboardCommand::TypeSearch {
                    text: "x".to_owned(),
                    at: Instant::now(),
                })
                .is_empty()
        );
        assert_eq!(dashboard.url(), "/dashboard/settings");
    }

    #[test]
    fn typed_search_commits_once_through_the_latest_timer() {
        let mut dashboard = Dashboard::default();
        let start = Instant::now();

        let mut tokens = Vec::new();
        for (offset, text) in [(0, "a"), (40, "ab"), (80, "abc")] {
            for event in dashboard.dispatch(DashboardCommand::TypeSearch {
                text: text.to_owned(),
                at: start + Duration::from_millis(offset),
            }) {
                if let DashboardEvent::SearchTimerArmed { view, token, delay } = event {
                    assert_eq!(view, ViewId::Activity);
                    assert_eq!(delay, Duration::from_millis(500));
                    tokens.push(token);
                }
            }
        }
        assert_eq!(tokens.len(), 3);

        let mut commits = Vec::new();
        for token in tokens {
            for event in dashboard.dispatch(DashboardCommand::SearchTimerFired {
                view: ViewId::Activity,
                token,
            }) {
                if let DashboardEvent::FiltersChanged { predicate, .. } = event {
                    commits.push(predicate.search_query);
                }
            }
        }
        assert_eq!(commits, vec!["abc".to_owned()]);
        assert_eq!(dashboard.url(), "/dashboard/activity?q=abc");
    }

    #[test]
    fn leaving_a_view_cancels_its_pending_search() {
        let mut dashboard = Dashboard::default();
        dashboard.set_active_view(ViewId::Recipients);
        let armed = dashboard.dispatch(DashboardCommand::TypeSearch {
            text: "sar".to_owned(),
            at: Instant::now(),
        });
        dashboard.set_active_view(ViewId::Groups);

        for event in armed {
            if let DashboardEvent::SearchTimerArmed { view, token, .. } = event {
                assert!(
                    dashboard
                        .dispatch(DashboardCommand::SearchTimerFired { view, token })
                        .is_empty()
                );
            }
        }
        assert_eq!(
            dashboard
                .filters(ViewId::Recipients)
                .map(|state| state.search_text().to_owned()),
            Some(String::new())
        );
    }

    #[test]
    fn restores_view_and_filters_from_a_shared_link() -> Result<()> {
        let dashboard = Dashboard::from_url(
            "https://kindred.example/dashboard/drafts?types=video,bogus&children=c1&from=2026-13-01",
            DashboardOptions::default(),
        );
        assert_eq!(dashboard.active_view(), ViewId::Drafts);
        assert_eq!(dashboard.active_filter_count(), 2);
        assert_eq!(dashboard.url(), "/dashboard/drafts?children=c1&types=video");
        assert_eq!(dashboard.right_pane().pane, RightPane::DraftPreview);
        Ok(())
    }

    #[test]
    fn unknown_view_segment_routes_to_placeholder_until_navigation() {
        let mut dashboard =
            Dashboard::from_url("/dashboard/timeline?q=x", DashboardOptions::default());
        assert_eq!(dashboard.active_view(), ViewId::Activity);
        assert_eq!(dashboard.right_pane().pane, RightPane::Placeholder);
        assert_eq!(dashboard.url(), "/dashboard/timeline?q=x");

        let events = dashboard.set_active_view(ViewId::Activity);
        assert!(!events.is_empty());
        assert_eq!(dashboard.right_pane().pane, RightPane::ActivityFilters);
        assert_eq!(dashboard.url(), "/dashboard/activity?q=x");
    }

    #[test]
    fn right_pane_mount_changes_on_every_view_change() -> Result<()> {
        let mut dashboard = Dashboard::default();
        let initial = dashboard.right_pane().mount;
        dashboard.set_active_view(ViewId::Recipients);
        dashboard.set_selected_id(id("r1")?);

        let props = dashboard.right_pane();
        assert_ne!(props.mount, initial);
        assert_eq!(props.pane, RightPane::RecipientDetails);
        assert_eq!(props.selection, Some(&id("r1")?));
        Ok(())
    }

    #[test]
    fn subscribers_see_events_in_dispatch_order() -> Result<()> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dashboard = Dashboard::default();
        let sink = Rc::clone(&seen);
        let subscription = dashboard.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        dashboard.set_selected_id(id("u1")?);
        dashboard.set_active_view(ViewId::Digests);
        assert_eq!(seen.borrow().len(), 4);
        assert!(matches!(
            seen.borrow()[1],
            DashboardEvent::SelectionCleared { .. }
        ));

        assert!(dashboard.unsubscribe(subscription));
        dashboard.set_active_view(ViewId::Children);
        assert_eq!(seen.borrow().len(), 4);
        Ok(())
    }
}
