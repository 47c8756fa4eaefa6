//! Home screen prompt.

use chrono::{DateTime, Utc};

use crate::session::UserSession;
use crate::tracker::{needs_pantry_update, show_alternate_prompt};

pub const DEFAULT_PROMPT: &str = "What do you desire?";

pub const ALTERNATE_PROMPT: &str = "The potential in your kitchen remains untapped. \
                                    We trust you enjoyed your pre-packaged satisfaction.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomePrompt {
    pub text: &'static str,
    pub alternate: bool,
    /// Show the "update your pantry" badge.
    pub needs_pantry_update: bool,
}

impl HomePrompt {
    pub fn for_session(session: &UserSession, now: DateTime<Utc>) -> Self {
        let alternate = show_alternate_prompt(session.consecutive_inactive_opens);
        Self {
            text: if alternate {
                ALTERNATE_PROMPT
            } else {
                DEFAULT_PROMPT
            },
            alternate,
            needs_pantry_update: needs_pantry_update(session.pantry_last_synced_at, now),
        }
    }
}
