//! Onboarding progress state machine.
//!
//! Progress is a linear chain:
//!
//! ```text
//! unstarted -> archetype_selected -> pantry_complete -> finished
//! ```
//!
//! The current step is persisted to the local key-value store under
//! [`STEP_KEY`] before it becomes visible in memory, so the app never shows
//! more progress than has been durably recorded.

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use desire_db::models::OnboardingStep;

use crate::error::SessionError;
use crate::session::SessionState;
use crate::store::KeyValueStore;

/// Key holding the persisted onboarding step.
pub const STEP_KEY: &str = "onboardingStep";

/// Boolean flag written by older app versions; `"true"` means finished.
/// Read as a fallback only, never written.
pub const LEGACY_FLAG_KEY: &str = "hasOnboarded";

pub struct OnboardingStateMachine {
    state: Arc<SessionState>,
    store: Arc<dyn KeyValueStore>,
    /// Serializes every change to the step, including hydration seeding.
    transitions: Mutex<()>,
}

impl OnboardingStateMachine {
    pub fn new(state: Arc<SessionState>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state,
            store,
            transitions: Mutex::new(()),
        }
    }

    /// Only a step's direct successor is reachable.
    pub fn is_valid_transition(from: OnboardingStep, to: OnboardingStep) -> bool {
        matches!(
            (from, to),
            (OnboardingStep::Unstarted, OnboardingStep::ArchetypeSelected)
                | (OnboardingStep::ArchetypeSelected, OnboardingStep::PantryComplete)
                | (OnboardingStep::PantryComplete, OnboardingStep::Finished)
        )
    }

    pub fn current(&self) -> OnboardingStep {
        self.state.onboarding_step()
    }

    /// Check that `to` can follow the current step without changing anything.
    pub fn check_advance(&self, to: OnboardingStep) -> Result<(), SessionError> {
        let from = self.current();
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition { from, to })
        }
    }

    /// Load the persisted step into memory.
    ///
    /// Falls back to the legacy boolean flag, then to `unstarted`. A stored
    /// value that does not parse counts as absent.
    pub async fn hydrate(&self) -> Result<OnboardingStep, SessionError> {
        let _guard = self.transitions.lock().await;

        let stored = self.store.get(STEP_KEY).await.map_err(SessionError::Persist)?;
        let step = match stored.as_deref().map(OnboardingStep::from_str) {
            Some(Ok(step)) => step,
            Some(Err(e)) => {
                warn!(error = %e, "ignoring unreadable onboarding step");
                self.legacy_step().await?
            }
            None => self.legacy_step().await?,
        };

        self.state.set_onboarding_step(step);
        info!(%step, "onboarding step loaded");
        Ok(step)
    }

    async fn legacy_step(&self) -> Result<OnboardingStep, SessionError> {
        let flag = self
            .store
            .get(LEGACY_FLAG_KEY)
            .await
            .map_err(SessionError::Persist)?;
        Ok(if flag.as_deref() == Some("true") {
            OnboardingStep::Finished
        } else {
            OnboardingStep::Unstarted
        })
    }

    /// Move to `to`, which must directly follow the current step.
    ///
    /// On an invalid transition or a failed write, the in-memory step is
    /// unchanged.
    pub async fn advance(&self, to: OnboardingStep) -> Result<(), SessionError> {
        let _guard = self.transitions.lock().await;

        self.check_advance(to)?;
        self.persist(to).await?;
        self.state.set_onboarding_step(to);
        info!(step = %to, "onboarding advanced");
        Ok(())
    }

    /// Return to `unstarted` and forget the chosen archetype.
    ///
    /// Memory is reset even when the local write fails. Nothing is written
    /// remotely.
    pub async fn reset(&self) {
        let _guard = self.transitions.lock().await;

        self.state.reset_onboarding();
        if let Err(e) = self.persist(OnboardingStep::Unstarted).await {
            warn!(error = %e, "failed to persist onboarding reset");
        }
    }

    /// Take the transition guard. Callers that seed the step from elsewhere
    /// hold it across their persist-then-apply sequence.
    pub(crate) async fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().await
    }

    pub(crate) async fn persist(&self, step: OnboardingStep) -> Result<(), SessionError> {
        self.store
            .set(STEP_KEY, step.as_str())
            .await
            .map_err(SessionError::Persist)
    }
}
