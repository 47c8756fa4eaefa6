//! Shared in-memory session state.
//!
//! [`SessionState`] is the single owner of everything the engine knows about
//! the current user: identity, onboarding progress, the pantry mirror and the
//! engagement counters. Components hold it behind an `Arc` and mutate it
//! through the narrow methods below, each of which takes the lock for one
//! short critical section and never across an await point.
//!
//! Every identity change bumps an epoch. Async work captures the epoch when
//! it starts and applies its result only if the epoch is unchanged, so
//! results that arrive after a sign-out are dropped.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use desire_db::models::OnboardingStep;

use crate::error::SessionError;
use crate::pantry::mirror::PantryMirror;

/// What the engine currently knows about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdentityStatus {
    /// No identity event has arrived yet.
    #[default]
    Pending,
    Absent,
    Present {
        user_id: String,
        /// Set once the first hydration for this identity has finished,
        /// whether or not it succeeded.
        hydrated: bool,
    },
}

impl IdentityStatus {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Present { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }
}

/// Per-user session fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    pub onboarding_step: OnboardingStep,
    pub onboarding_archetype: Option<String>,
    pub pantry_last_synced_at: Option<DateTime<Utc>>,
    pub consecutive_inactive_opens: u32,
}

/// A consistent copy of the whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: IdentityStatus,
    pub session: UserSession,
    pub pantry: PantryMirror,
    pub epoch: u64,
}

/// Values produced by a successful hydration.
#[derive(Debug, Clone)]
pub(crate) struct HydrationSeed {
    pub step: OnboardingStep,
    pub archetype: Option<String>,
    pub pantry: PantryMirror,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub inactive_opens: u32,
}

#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<SessionSnapshot>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().clone()
    }

    pub fn identity(&self) -> IdentityStatus {
        self.lock().identity.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.lock().identity.user_id().map(str::to_owned)
    }

    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    pub fn onboarding_step(&self) -> OnboardingStep {
        self.lock().session.onboarding_step
    }

    pub fn inactive_opens(&self) -> u32 {
        self.lock().session.consecutive_inactive_opens
    }

    /// The signed-in user and the epoch to tag async work with.
    pub fn require_identity(&self) -> Result<(String, u64), SessionError> {
        let inner = self.lock();
        inner
            .identity
            .user_id()
            .map(|id| (id.to_owned(), inner.epoch))
            .ok_or(SessionError::NoIdentity)
    }

    /// Record a newly signed-in user and return the epoch for its hydration.
    ///
    /// The pantry mirror and counters start empty. Onboarding progress is
    /// left to the onboarding state machine.
    pub fn begin_identity(&self, user_id: &str) -> u64 {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.identity = IdentityStatus::Present {
            user_id: user_id.to_owned(),
            hydrated: false,
        };
        inner.pantry.clear();
        inner.session.pantry_last_synced_at = None;
        inner.session.consecutive_inactive_opens = 0;
        inner.epoch
    }

    /// Clear everything and mark the identity absent.
    pub fn sign_out(&self) -> u64 {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.identity = IdentityStatus::Absent;
        inner.session = UserSession::default();
        inner.pantry.clear();
        inner.epoch
    }

    /// Apply hydration results if `epoch` is still current.
    pub(crate) fn apply_hydration(&self, epoch: u64, seed: HydrationSeed) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return false;
        }
        inner.session = UserSession {
            onboarding_step: seed.step,
            onboarding_archetype: seed.archetype,
            pantry_last_synced_at: seed.last_synced_at,
            consecutive_inactive_opens: seed.inactive_opens,
        };
        inner.pantry = seed.pantry;
        if let IdentityStatus::Present { hydrated, .. } = &mut inner.identity {
            *hydrated = true;
        }
        true
    }

    /// Mark hydration finished without applying data, e.g. after a failure.
    pub(crate) fn mark_hydrated(&self, epoch: u64) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return false;
        }
        if let IdentityStatus::Present { hydrated, .. } = &mut inner.identity {
            *hydrated = true;
        }
        true
    }

    /// Run `f` against the state if `epoch` is still current.
    pub(crate) fn apply_if_current(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut SessionSnapshot),
    ) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return false;
        }
        f(&mut inner);
        true
    }

    pub(crate) fn set_onboarding_step(&self, step: OnboardingStep) {
        self.lock().session.onboarding_step = step;
    }

    pub(crate) fn set_archetype(&self, archetype: Option<String>) {
        self.lock().session.onboarding_archetype = archetype;
    }

    pub(crate) fn reset_onboarding(&self) {
        let mut inner = self.lock();
        inner.session.onboarding_step = OnboardingStep::Unstarted;
        inner.session.onboarding_archetype = None;
    }

    pub(crate) fn increment_inactive_opens(&self) -> u32 {
        let mut inner = self.lock();
        inner.session.consecutive_inactive_opens =
            inner.session.consecutive_inactive_opens.saturating_add(1);
        inner.session.consecutive_inactive_opens
    }

    pub(crate) fn reset_inactive_opens(&self) {
        self.lock().session.consecutive_inactive_opens = 0;
    }
}
