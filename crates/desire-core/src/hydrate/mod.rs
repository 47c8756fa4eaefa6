//! Profile hydration on sign-in.
//!
//! Fetches the profile and the pantry in parallel and seeds the session from
//! them. A result that arrives after the identity changed is discarded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use desire_db::models::OnboardingStep;

use crate::error::{RemoteOp, SessionError};
use crate::onboarding::OnboardingStateMachine;
use crate::pantry::PantryMirror;
use crate::session::{HydrationSeed, SessionState};
use crate::store::DocumentStore;

/// What happened to a hydration that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationOutcome {
    Applied { step: OnboardingStep, items: usize },
    /// The identity changed while the fetches were in flight.
    Discarded,
}

pub struct ProfileHydrator {
    state: Arc<SessionState>,
    onboarding: Arc<OnboardingStateMachine>,
    docs: Arc<dyn DocumentStore>,
}

impl ProfileHydrator {
    pub fn new(
        state: Arc<SessionState>,
        onboarding: Arc<OnboardingStateMachine>,
        docs: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            state,
            onboarding,
            docs,
        }
    }

    /// Hydrate the session of `user_id`, which was signed in at `epoch`.
    ///
    /// On failure the session is marked hydrated with no data applied, so
    /// the app leaves its loading state and falls back to onboarding.
    pub async fn hydrate(
        &self,
        user_id: &str,
        epoch: u64,
    ) -> Result<HydrationOutcome, SessionError> {
        debug!(user_id, epoch, "hydrating session");

        let fetched = tokio::try_join!(
            async {
                self.docs
                    .get_profile(user_id)
                    .await
                    .map_err(SessionError::remote(RemoteOp::FetchProfile))
            },
            async {
                self.docs
                    .list_pantry(user_id)
                    .await
                    .map_err(SessionError::remote(RemoteOp::FetchPantry))
            },
        );
        let (profile, names) = match fetched {
            Ok(v) => v,
            Err(e) => {
                self.state.mark_hydrated(epoch);
                return Err(e);
            }
        };

        let profile = profile.unwrap_or_default();
        let step = if profile.marks_onboarding_complete() {
            OnboardingStep::Finished
        } else {
            OnboardingStep::Unstarted
        };
        let last_synced_at = profile.pantry_last_updated.and_then(|ms| {
            let parsed = DateTime::<Utc>::from_timestamp_millis(ms);
            if parsed.is_none() {
                warn!(user_id, ms, "ignoring out-of-range pantry timestamp");
            }
            parsed
        });
        let pantry: PantryMirror = names.into_iter().collect();
        let items = pantry.len();
        let seed = HydrationSeed {
            step,
            archetype: profile.onboarding_archetype,
            pantry,
            last_synced_at,
            inactive_opens: profile.consecutive_inactive_opens.unwrap_or(0),
        };

        let _guard = self.onboarding.lock_transitions().await;
        if !self.state.is_current(epoch) {
            debug!(user_id, epoch, "identity changed during hydration; discarding");
            return Ok(HydrationOutcome::Discarded);
        }
        if let Err(e) = self.onboarding.persist(step).await {
            self.state.mark_hydrated(epoch);
            return Err(e);
        }
        if !self.state.apply_hydration(epoch, seed) {
            debug!(user_id, epoch, "identity changed during hydration; discarding");
            return Ok(HydrationOutcome::Discarded);
        }

        info!(user_id, %step, items, "session hydrated");
        Ok(HydrationOutcome::Applied { step, items })
    }
}
