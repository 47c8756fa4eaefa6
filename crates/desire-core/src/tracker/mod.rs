//! Engagement tracking across app foreground sessions.
//!
//! A "foreground session" runs from one return to the foreground to the
//! next. If a session ends without a search, the consecutive-inactive-opens
//! counter goes up; a search resets it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::session::SessionState;
use crate::store::AppLifecycle;

/// Pantry data older than this is stale.
pub const STALE_AFTER_DAYS: i64 = 7;

/// Inactive opens at which the home screen switches to its alternate prompt.
pub const ALTERNATE_PROMPT_THRESHOLD: u32 = 3;

/// Result of feeding one lifecycle transition to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Not a return to the foreground.
    Ignored,
    /// A new foreground session began.
    NewSession {
        /// The finished session had no search and was counted.
        counted_inactive: bool,
        inactive_opens: u32,
    },
}

pub struct SessionTracker {
    state: Arc<SessionState>,
    search_performed: AtomicBool,
    last: Mutex<AppLifecycle>,
}

impl SessionTracker {
    pub fn new(state: Arc<SessionState>) -> Self {
        Self {
            state,
            search_performed: AtomicBool::new(false),
            last: Mutex::new(AppLifecycle::Active),
        }
    }

    pub fn mark_search_performed(&self) {
        self.search_performed.store(true, Ordering::SeqCst);
    }

    pub fn search_performed(&self) -> bool {
        self.search_performed.load(Ordering::SeqCst)
    }

    /// Feed a lifecycle transition. Only a move to `Active` from
    /// `Inactive` or `Background` starts a new foreground session.
    pub fn on_transition(&self, next: AppLifecycle) -> TransitionOutcome {
        let previous = {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *last, next)
        };
        if !(previous.is_away() && next == AppLifecycle::Active) {
            return TransitionOutcome::Ignored;
        }

        let searched = self.search_performed.swap(false, Ordering::SeqCst);
        let inactive_opens = if searched {
            self.state.inactive_opens()
        } else {
            self.state.increment_inactive_opens()
        };
        debug!(%previous, searched, inactive_opens, "foreground session started");
        TransitionOutcome::NewSession {
            counted_inactive: !searched,
            inactive_opens,
        }
    }

    pub fn reset_inactive_opens(&self) {
        self.state.reset_inactive_opens();
    }

    /// Forget the search flag and the last lifecycle state.
    pub fn reset(&self) {
        self.search_performed.store(false, Ordering::SeqCst);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = AppLifecycle::Active;
    }
}

/// Whether the pantry should be reviewed. A pantry never synced counts as
/// stale; otherwise it is stale once strictly more than
/// [`STALE_AFTER_DAYS`] have passed.
pub fn needs_pantry_update(last_synced: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_synced {
        None => true,
        Some(at) => now - at > TimeDelta::days(STALE_AFTER_DAYS),
    }
}

pub fn show_alternate_prompt(inactive_opens: u32) -> bool {
    inactive_opens >= ALTERNATE_PROMPT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> (SessionTracker, Arc<SessionState>) {
        let state = Arc::new(SessionState::new());
        (SessionTracker::new(state.clone()), state)
    }

    #[test]
    fn return_without_search_counts() {
        let (t, state) = tracker();
        t.on_transition(AppLifecycle::Background);
        let outcome = t.on_transition(AppLifecycle::Active);
        assert_eq!(
            outcome,
            TransitionOutcome::NewSession {
                counted_inactive: true,
                inactive_opens: 1
            }
        );
        assert_eq!(state.inactive_opens(), 1);
    }

    #[test]
    fn return_after_search_does_not_count_and_clears_flag() {
        let (t, state) = tracker();
        t.mark_search_performed();
        t.on_transition(AppLifecycle::Inactive);
        let outcome = t.on_transition(AppLifecycle::Active);
        assert_eq!(
            outcome,
            TransitionOutcome::NewSession {
                counted_inactive: false,
                inactive_opens: 0
            }
        );
        assert!(!t.search_performed());

        t.on_transition(AppLifecycle::Background);
        t.on_transition(AppLifecycle::Active);
        assert_eq!(state.inactive_opens(), 1);
    }

    #[test]
    fn other_transitions_are_ignored() {
        let (t, state) = tracker();
        assert_eq!(t.on_transition(AppLifecycle::Active), TransitionOutcome::Ignored);
        assert_eq!(t.on_transition(AppLifecycle::Inactive), TransitionOutcome::Ignored);
        assert_eq!(t.on_transition(AppLifecycle::Background), TransitionOutcome::Ignored);
        assert_eq!(state.inactive_opens(), 0);
    }

    #[test]
    fn reset_clears_flag_and_counter_resets() {
        let (t, state) = tracker();
        t.on_transition(AppLifecycle::Background);
        t.on_transition(AppLifecycle::Active);
        t.mark_search_performed();
        t.on_transition(AppLifecycle::Background);

        t.reset();
        assert!(!t.search_performed());
        // After reset the tracker assumes the foreground again.
        assert_eq!(t.on_transition(AppLifecycle::Active), TransitionOutcome::Ignored);

        t.reset_inactive_opens();
        assert_eq!(state.inactive_opens(), 0);
    }

    #[test]
    fn staleness_boundary_is_strict() {
        let now = Utc::now();
        assert!(needs_pantry_update(None, now));
        assert!(!needs_pantry_update(Some(now), now));
        assert!(!needs_pantry_update(Some(now - TimeDelta::days(7)), now));
        assert!(!needs_pantry_update(
            Some(now - TimeDelta::days(7) + TimeDelta::milliseconds(1)),
            now
        ));
        assert!(needs_pantry_update(
            Some(now - TimeDelta::days(7) - TimeDelta::milliseconds(1)),
            now
        ));
    }

    #[test]
    fn alternate_prompt_threshold() {
        assert!(!show_alternate_prompt(0));
        assert!(!show_alternate_prompt(2));
        assert!(show_alternate_prompt(3));
        assert!(show_alternate_prompt(10));
    }
}
