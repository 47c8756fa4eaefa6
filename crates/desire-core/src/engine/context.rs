//! The wired-up session components and the user-facing workflows built on
//! top of them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use desire_db::models::{OnboardingStep, ProfileDocument};

use crate::error::{RemoteOp, SessionError};
use crate::home::HomePrompt;
use crate::hydrate::{HydrationOutcome, ProfileHydrator};
use crate::navigation::{Flow, select_flow};
use crate::onboarding::OnboardingStateMachine;
use crate::pantry::{PantryComparison, PantrySynchronizer, compare_ingredients};
use crate::presets::{self, Archetype};
use crate::session::{IdentityStatus, SessionSnapshot, SessionState};
use crate::store::{AppLifecycle, DocumentStore, KeyValueStore};
use crate::tracker::{SessionTracker, TransitionOutcome};

/// Every component of one running session, sharing one [`SessionState`].
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct SessionContext {
    pub state: Arc<SessionState>,
    pub onboarding: Arc<OnboardingStateMachine>,
    pub pantry: Arc<PantrySynchronizer>,
    pub hydrator: Arc<ProfileHydrator>,
    pub tracker: Arc<SessionTracker>,
    docs: Arc<dyn DocumentStore>,
}

impl SessionContext {
    pub fn new(kv: Arc<dyn KeyValueStore>, docs: Arc<dyn DocumentStore>) -> Self {
        let state = Arc::new(SessionState::new());
        let onboarding = Arc::new(OnboardingStateMachine::new(state.clone(), kv));
        let pantry = Arc::new(PantrySynchronizer::new(state.clone(), docs.clone()));
        let hydrator = Arc::new(ProfileHydrator::new(
            state.clone(),
            onboarding.clone(),
            docs.clone(),
        ));
        let tracker = Arc::new(SessionTracker::new(state.clone()));
        Self {
            state,
            onboarding,
            pantry,
            hydrator,
            tracker,
            docs,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn current_flow(&self) -> Flow {
        let snap = self.state.snapshot();
        select_flow(&snap.identity, snap.session.onboarding_step)
    }

    pub fn home_prompt(&self, now: DateTime<Utc>) -> HomePrompt {
        HomePrompt::for_session(&self.state.snapshot().session, now)
    }

    pub fn compare_ingredients<S: AsRef<str>>(&self, ingredients: &[S]) -> PantryComparison {
        compare_ingredients(&self.state.snapshot().pantry, ingredients)
    }

    // -- identity ----------------------------------------------------------

    /// Start a session for `user_id` and return its epoch. A different user
    /// still signed in must be signed out first.
    pub fn begin_session(&self, user_id: &str) -> u64 {
        let epoch = self.state.begin_identity(user_id);
        info!(user_id, epoch, "session started");
        epoch
    }

    /// Start a session for `user_id` and hydrate it. Any other signed-in
    /// user is signed out first.
    pub async fn sign_in(&self, user_id: &str) -> Result<HydrationOutcome, SessionError> {
        if self.state.user_id().is_some_and(|current| current != user_id) {
            self.sign_out().await;
        }
        let epoch = self.begin_session(user_id);
        self.hydrator.hydrate(user_id, epoch).await
    }

    /// Reset the session, onboarding progress and foreground tracking.
    pub async fn sign_out(&self) {
        self.state.sign_out();
        self.onboarding.reset().await;
        self.tracker.reset();
        info!("session cleared");
    }

    // -- engagement --------------------------------------------------------

    /// Handle a search from the home screen. Returns the trimmed query, or
    /// `None` for a blank one, which changes nothing.
    pub fn submit_search(&self, query: &str) -> Option<String> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        self.tracker.reset_inactive_opens();
        self.tracker.mark_search_performed();
        debug!(query, "search submitted");
        Some(query.to_owned())
    }

    /// Feed a lifecycle transition to the tracker. When a new foreground
    /// session starts for a hydrated user, the counter is written to the
    /// profile. Before hydration the profile's own value is still unknown,
    /// so only the local counter moves.
    pub async fn on_lifecycle(&self, next: AppLifecycle) -> TransitionOutcome {
        let outcome = self.tracker.on_transition(next);
        if let TransitionOutcome::NewSession { inactive_opens, .. } = outcome {
            if let IdentityStatus::Present {
                user_id,
                hydrated: true,
            } = self.state.identity()
            {
                self.mirror_inactive_opens(&user_id, inactive_opens).await;
            }
        }
        outcome
    }

    async fn mirror_inactive_opens(&self, user_id: &str, count: u32) {
        let patch = ProfileDocument {
            consecutive_inactive_opens: Some(count),
            ..Default::default()
        };
        if let Err(e) = self.docs.merge_profile(user_id, &patch).await {
            warn!(user_id, error = %e, "failed to record inactive opens on profile");
        }
    }

    // -- onboarding workflows ---------------------------------------------

    /// Pick a starting archetype and move to the checklist.
    ///
    /// Choosing again while on the checklist replaces the archetype without
    /// advancing.
    pub async fn choose_archetype(&self, name: &str) -> Result<&'static Archetype, SessionError> {
        let archetype = presets::find_archetype(name)
            .ok_or_else(|| SessionError::UnknownArchetype(name.to_owned()))?;

        if self.onboarding.current() != OnboardingStep::ArchetypeSelected {
            self.onboarding
                .advance(OnboardingStep::ArchetypeSelected)
                .await?;
        }
        self.state.set_archetype(Some(archetype.title.clone()));
        info!(archetype = %archetype.key, "archetype chosen");
        Ok(archetype)
    }

    /// Save the checklist selection as the pantry and move to detailed setup.
    pub async fn confirm_checklist<S: AsRef<str> + Sync>(
        &self,
        items: &[S],
    ) -> Result<Vec<String>, SessionError> {
        self.onboarding.check_advance(OnboardingStep::PantryComplete)?;
        let (user_id, _) = self.state.require_identity()?;

        let saved = self.pantry.replace_all(items).await?;
        let snap = self.state.snapshot();
        let patch = ProfileDocument {
            onboarding_archetype: snap.session.onboarding_archetype,
            pantry_last_updated: snap
                .session
                .pantry_last_synced_at
                .map(|t| t.timestamp_millis()),
            ..Default::default()
        };
        self.docs
            .merge_profile(&user_id, &patch)
            .await
            .map_err(SessionError::remote(RemoteOp::UpdateProfile))?;

        self.onboarding
            .advance(OnboardingStep::PantryComplete)
            .await?;
        Ok(saved)
    }

    /// Complete onboarding, optionally replacing the pantry with a refined
    /// selection first.
    pub async fn finish_onboarding<S: AsRef<str> + Sync>(
        &self,
        items: Option<&[S]>,
    ) -> Result<(), SessionError> {
        self.onboarding.check_advance(OnboardingStep::Finished)?;
        let (user_id, _) = self.state.require_identity()?;

        if let Some(items) = items {
            self.pantry.replace_all(items).await?;
        }
        let patch = ProfileDocument {
            onboarding_completed: Some(true),
            consecutive_inactive_opens: Some(0),
            ..Default::default()
        };
        self.docs
            .merge_profile(&user_id, &patch)
            .await
            .map_err(SessionError::remote(RemoteOp::UpdateProfile))?;

        self.onboarding.advance(OnboardingStep::Finished).await?;
        self.tracker.reset_inactive_opens();
        info!(user_id, "onboarding finished");
        Ok(())
    }
}
