// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

use crate::ids::DebounceToken;

pub const COMPACT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const HEAVY_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingInput {
    value: String,
    token: DebounceToken,
    deadline: Instant,
}

/// Holds the raw value of a search box and releases it only after a quiet
/// period with no further input.
///
/// Every `input` re-arms the timer under a fresh token, so a timer armed for
/// an earlier keystroke can never commit. The debouncer is driven by explicit
/// instants; whoever owns the real timer calls `fire` with the token it was
/// handed, or calls `poll` with the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer {
    delay: Duration,
    last_token: DebounceToken,
    pending: Option<PendingInput>,
    disposed: bool,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_token: DebounceToken::default(),
            pending: None,
            disposed: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.value.as_str())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Records a keystroke and returns the token for the timer that should be
    /// armed. Returns `None` once disposed.
    pub fn input(&mut self, value: impl Into<String>, now: Instant) -> Option<DebounceToken> {
        if self.disposed {
            return None;
        }
        self.last_token = self.last_token.next();
        self.pending = Some(PendingInput {
            value: value.into(),
            token: self.last_token,
            deadline: now + self.delay,
        });
        Some(self.last_token)
    }

    /// Timer callback. Commits the pending value if `token` is the most
    /// recently armed one.
    pub fn fire(&mut self, token: DebounceToken) -> Option<String> {
        let current = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.token == token);
        if !current {
            return None;
        }
        self.pending.take().map(|pending| pending.value)
    }

    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.deadline);
        if !due {
            return None;
        }
        self.pending.take().map(|pending| pending.value)
    }

    /// Commits immediately, skipping the rest of the quiet period.
    pub fn flush(&mut self) -> Option<String> {
        self.pending.take().map(|pending| pending.value)
    }

    /// Drops pending input. Timers already armed become stale.
    pub fn cancel(&mut self) -> bool {
        self.last_token = self.last_token.next();
        self.pending.take().is_some()
    }

    /// Cancels and refuses all further input.
    pub fn dispose(&mut self) {
        self.cancel();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::{COMPACT_SEARCH_DEBOUNCE, Debouncer};
    use std::time::{Duration, Instant};

    #[test]
    fn rapid_keystrokes_commit_once_with_the_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(COMPACT_SEARCH_DEBOUNCE);

        let first = debouncer.input("a", start);
        let second = debouncer.input("ab", start + Duration::from_millis(80));
        let third = debouncer.input("abc", start + Duration::from_millis(160));

        let mut commits = Vec::new();
        for token in [first, second, third].into_iter().flatten() {
            if let Some(value) = debouncer.fire(token) {
                commits.push(value);
            }
        }

        assert_eq!(commits, vec!["abc".to_owned()]);
        assert_eq!(debouncer.pending(), None);
    }

    #[test]
    fn poll_waits_for_the_quiet_period_measured_from_the_last_keystroke() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        debouncer.input("s", start);
        debouncer.input("sa", start + Duration::from_millis(200));

        assert_eq!(debouncer.poll(start + Duration::from_millis(350)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)),
            Some("sa".to_owned())
        );
        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn cancel_makes_armed_timers_stale() {
        let mut debouncer = Debouncer::new(COMPACT_SEARCH_DEBOUNCE);
        let token = debouncer.input("sarah", Instant::now());

        assert!(debouncer.cancel());
        assert_eq!(token.and_then(|token| debouncer.fire(token)), None);
    }

    #[test]
    fn disposed_debouncer_ignores_input_and_late_timers() {
        let mut debouncer = Debouncer::new(COMPACT_SEARCH_DEBOUNCE);
        let token = debouncer.input("late", Instant::now());
        debouncer.dispose();

        assert!(debouncer.is_disposed());
        assert_eq!(token.and_then(|token| debouncer.fire(token)), None);
        assert_eq!(debouncer.input("more", Instant::now()), None);
    }

    #[test]
    fn flush_commits_without_waiting() {
        let mut debouncer = Debouncer::new(COMPACT_SEARCH_DEBOUNCE);
        debouncer.input("emma", Instant::now());
        assert_eq!(debouncer.flush(), Some("emma".to_owned()));
        assert_eq!(debouncer.flush(), None);
    }
}
