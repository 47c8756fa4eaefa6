//! Errors surfaced by session operations.
//!
//! Every variant is recoverable: callers catch it at the boundary that
//! issued the operation and show [`SessionError::user_message`].

use std::fmt;

use desire_db::models::OnboardingStep;

/// The remote document-store call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    FetchProfile,
    FetchPantry,
    UpsertItem,
    DeleteItem,
    UpdateProfile,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FetchProfile => "profile fetch",
            Self::FetchPantry => "pantry fetch",
            Self::UpsertItem => "pantry item upsert",
            Self::DeleteItem => "pantry item delete",
            Self::UpdateProfile => "profile update",
        };
        f.write_str(s)
    }
}

/// Errors from onboarding, pantry, and hydration operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation needs a signed-in user and there is none. Raised
    /// before any I/O.
    #[error("no signed-in user")]
    NoIdentity,

    #[error("item name is empty")]
    EmptyItemName,

    #[error("unknown archetype: {0:?}")]
    UnknownArchetype(String),

    #[error("invalid onboarding transition: {from} -> {to}")]
    InvalidTransition {
        from: OnboardingStep,
        to: OnboardingStep,
    },

    /// Writing the onboarding flag to the local key-value store failed.
    #[error("failed to persist onboarding progress")]
    Persist(#[source] anyhow::Error),

    #[error("remote {op} failed")]
    Remote {
        op: RemoteOp,
        #[source]
        source: anyhow::Error,
    },

    /// Some upserts of a bulk pantry write failed. Upserts that succeeded
    /// are not rolled back.
    #[error("{count} of {total} pantry writes failed", count = .failed.len())]
    PartialBulk {
        failed: Vec<String>,
        total: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl SessionError {
    pub(crate) fn remote(op: RemoteOp) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Remote { op, source }
    }

    /// Short message suitable for a toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoIdentity => "User ID missing",
            Self::EmptyItemName => "Enter an item name",
            Self::UnknownArchetype(_) => "Unknown archetype",
            Self::InvalidTransition { .. } => "Finish the previous onboarding step first",
            Self::Persist(_) => "Failed to save your progress",
            Self::Remote { op, .. } => match op {
                RemoteOp::FetchProfile | RemoteOp::FetchPantry => {
                    "Error during authentication state change"
                }
                RemoteOp::UpsertItem => "Failed to add item",
                RemoteOp::DeleteItem => "Failed to remove item",
                RemoteOp::UpdateProfile => "Failed to update profile",
            },
            Self::PartialBulk { .. } => "Failed to save pantry",
        }
    }

    /// Whether the operation was refused before any I/O was attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoIdentity
                | Self::EmptyItemName
                | Self::UnknownArchetype(_)
                | Self::InvalidTransition { .. }
        )
    }
}
