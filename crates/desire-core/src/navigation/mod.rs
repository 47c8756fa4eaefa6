//! Top-level flow selection.
//!
//! ```text
//! identity pending, or present but not hydrated  -> Loading
//! identity absent                               -> Auth
//! present, onboarding not finished              -> Onboarding(entry)
//! present, onboarding finished                  -> Main
//! ```

use std::fmt;

use desire_db::models::OnboardingStep;

use crate::session::IdentityStatus;

/// Screen the onboarding flow resumes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingEntry {
    Welcome,
    Checklist,
    AdvancedSetup,
}

impl OnboardingEntry {
    /// Entry point for an unfinished step.
    pub fn for_step(step: OnboardingStep) -> Self {
        match step {
            OnboardingStep::Unstarted => Self::Welcome,
            OnboardingStep::ArchetypeSelected => Self::Checklist,
            OnboardingStep::PantryComplete | OnboardingStep::Finished => Self::AdvancedSetup,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Loading,
    Auth,
    Onboarding(OnboardingEntry),
    Main,
}

impl Flow {
    /// Route name of the first screen in this flow.
    pub fn route(self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Auth => "Login",
            Self::Onboarding(OnboardingEntry::Welcome) => "Welcome",
            Self::Onboarding(OnboardingEntry::Checklist) => "Checklist",
            Self::Onboarding(OnboardingEntry::AdvancedSetup) => "AdvancedSetup",
            Self::Main => "Home",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("loading"),
            Self::Auth => f.write_str("auth"),
            Self::Onboarding(entry) => write!(f, "onboarding ({entry:?})"),
            Self::Main => f.write_str("main"),
        }
    }
}

/// Pure function of the identity status and onboarding step.
pub fn select_flow(identity: &IdentityStatus, step: OnboardingStep) -> Flow {
    match identity {
        IdentityStatus::Pending | IdentityStatus::Present { hydrated: false, .. } => Flow::Loading,
        IdentityStatus::Absent => Flow::Auth,
        IdentityStatus::Present { hydrated: true, .. } if step.is_finished() => Flow::Main,
        IdentityStatus::Present { hydrated: true, .. } => {
            Flow::Onboarding(OnboardingEntry::for_step(step))
        }
    }
}
