// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::fetch::{DetailPanel, DetailRequest, ListPanel, ListRequest};
use crate::ids::{DebounceToken, EntityId, SubscriptionId, Ticket};
use crate::model::{Entity, EntitySummary, ViewId};
use crate::service::{DataService, FetchError};
use crate::state::{Dashboard, DashboardCommand, DashboardEvent};

/// Completions delivered back to the session thread by fetch workers and
/// search timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    DetailLoaded {
        ticket: Ticket,
        result: Result<Entity, FetchError>,
    },
    ListLoaded {
        ticket: Ticket,
        result: Result<Vec<EntitySummary>, FetchError>,
    },
    SearchTimerFired {
        view: ViewId,
        token: DebounceToken,
    },
}

/// Drives a `Dashboard` against a data service. Fetches run on worker
/// threads and search timers on sleeper threads; both report back over a
/// channel that `pump` and `wait_until` drain on the owning thread, so panel
/// state is only ever touched here.
pub struct Session {
    service: Arc<dyn DataService>,
    dashboard: Dashboard,
    detail: DetailPanel,
    list: ListPanel,
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
    in_flight: usize,
    disposed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dashboard", &self.dashboard)
            .field("detail", &self.detail)
            .field("list", &self.list)
            .field("in_flight", &self.in_flight)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Starts the session and loads the list for the dashboard's active view.
    pub fn new(service: Arc<dyn DataService>, dashboard: Dashboard) -> Self {
        let max_retries = dashboard.options().max_retries;
        let (tx, rx) = mpsc::channel();
        let mut session = Self {
            service,
            dashboard,
            detail: DetailPanel::new(max_retries),
            list: ListPanel::new(max_retries),
            tx,
            rx,
            in_flight: 0,
            disposed: false,
        };
        session.reload_list();
        session
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn detail(&self) -> &DetailPanel {
        &self.detail
    }

    pub fn list(&self) -> &ListPanel {
        &self.list
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&DashboardEvent) + 'static,
    ) -> SubscriptionId {
        self.dashboard.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.dashboard.unsubscribe(id)
    }

    pub fn apply(&mut self, command: DashboardCommand) -> Vec<DashboardEvent> {
        if self.disposed {
            return Vec::new();
        }
        let events = self.dashboard.dispatch(command);
        self.react(&events);
        events
    }

    /// Feeds a keystroke into the active view's search box, timestamped now.
    pub fn type_search(&mut self, text: impl Into<String>) -> Vec<DashboardEvent> {
        self.apply(DashboardCommand::TypeSearch {
            text: text.into(),
            at: Instant::now(),
        })
    }

    pub fn retry_detail(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        match self.detail.retry() {
            Some(request) => {
                debug!(id = %request.id, "retrying detail load");
                self.spawn_detail(request);
                true
            }
            None => false,
        }
    }

    pub fn retry_list(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        match self.list.retry() {
            Some(request) => {
                debug!(kind = %request.kind, "retrying list load");
                self.spawn_list(request);
                true
            }
            None => false,
        }
    }

    /// Applies every completion already waiting. Returns how many there were.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.receive(event);
            handled += 1;
        }
        handled
    }

    /// Blocks until `done` holds, nothing is left in flight, or `timeout`
    /// passes. Returns the final value of `done`.
    pub fn wait_until(&mut self, timeout: Duration, mut done: impl FnMut(&Self) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done(self) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline || self.in_flight == 0 {
                return false;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(event) => self.receive(event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return done(self);
                }
            }
        }
    }

    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        self.wait_until(timeout, |session| session.in_flight == 0)
    }

    /// Unmounts everything. Responses and timers that arrive afterwards are
    /// dropped.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.dashboard.dispose();
        self.detail.clear();
        self.list.clear();
        debug!("session disposed");
    }

    fn receive(&mut self, event: SessionEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match event {
            SessionEvent::DetailLoaded { ticket, result } => {
                self.detail.complete(ticket, result);
            }
            SessionEvent::ListLoaded { ticket, result } => {
                self.list.complete(ticket, result);
            }
            SessionEvent::SearchTimerFired { view, token } => {
                self.apply(DashboardCommand::SearchTimerFired { view, token });
            }
        }
    }

    fn react(&mut self, events: &[DashboardEvent]) {
        for event in events {
            match event {
                DashboardEvent::SelectionCleared { id, .. } => {
                    if self.detail.selection() == Some(id) {
                        self.detail.clear();
                    }
                }
                DashboardEvent::ViewChanged { .. } => {
                    self.detail.clear();
                    self.reload_list();
                }
                DashboardEvent::SelectionChanged { view, id } => {
                    self.show_detail(*view, id);
                }
                DashboardEvent::FiltersChanged { view, .. } => {
                    if *view == self.dashboard.active_view() {
                        self.reload_list();
                    }
                }
                DashboardEvent::SearchTimerArmed { view, token, delay } => {
                    self.spawn_timer(*view, *token, *delay);
                }
                DashboardEvent::UrlReplaced(_) => {}
            }
        }
    }

    fn show_detail(&mut self, view: ViewId, id: &EntityId) {
        let Some(kind) = view.entity_kind() else {
            return;
        };
        if !self.dashboard.right_pane().pane.shows_selection() {
            return;
        }
        let request = self.detail.show(kind, id.clone());
        self.spawn_detail(request);
    }

    fn reload_list(&mut self) {
        let view = self.dashboard.active_view();
        let kind = view.entity_kind().filter(|_| view.is_list());
        let predicate = self
            .dashboard
            .filters(view)
            .map(|state| state.predicate().clone());
        match (kind, predicate) {
            (Some(kind), Some(predicate)) => {
                let request = self.list.load(kind, predicate);
                self.spawn_list(request);
            }
            _ => self.list.clear(),
        }
    }

    fn spawn_detail(&mut self, request: DetailRequest) {
        let service = Arc::clone(&self.service);
        let sender = self.tx.clone();
        self.in_flight += 1;
        debug!(ticket = request.ticket.get(), kind = %request.kind, id = %request.id, "detail load started");
        thread::spawn(move || {
            let result = service.get_entity(request.kind, &request.id);
            let _ = sender.send(SessionEvent::DetailLoaded {
                ticket: request.ticket,
                result,
            });
        });
    }

    fn spawn_list(&mut self, request: ListRequest) {
        let service = Arc::clone(&self.service);
        let sender = self.tx.clone();
        self.in_flight += 1;
        debug!(ticket = request.ticket.get(), kind = %request.kind, "list load started");
        thread::spawn(move || {
            let result = service.query_entities(request.kind, &request.predicate);
            let _ = sender.send(SessionEvent::ListLoaded {
                ticket: request.ticket,
                result,
            });
        });
    }

    fn spawn_timer(&mut self, view: ViewId, token: DebounceToken, delay: Duration) {
        let sender = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = sender.send(SessionEvent::SearchTimerFired { view, token });
        });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}
