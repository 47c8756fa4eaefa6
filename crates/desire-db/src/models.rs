use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Progress through the onboarding flow.
///
/// Steps are ordered; the derived `Ord` follows declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    #[default]
    Unstarted,
    ArchetypeSelected,
    PantryComplete,
    Finished,
}

impl OnboardingStep {
    /// The step that directly follows this one, if any.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Unstarted => Some(Self::ArchetypeSelected),
            Self::ArchetypeSelected => Some(Self::PantryComplete),
            Self::PantryComplete => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Whether onboarding has been completed.
    pub fn is_finished(self) -> bool {
        self == Self::Finished
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::ArchetypeSelected => "archetype_selected",
            Self::PantryComplete => "pantry_complete",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnboardingStep {
    type Err = OnboardingStepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unstarted" => Ok(Self::Unstarted),
            "archetype_selected" => Ok(Self::ArchetypeSelected),
            "pantry_complete" => Ok(Self::PantryComplete),
            "finished" => Ok(Self::Finished),
            other => Err(OnboardingStepParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`OnboardingStep`] string.
#[derive(Debug, Clone)]
pub struct OnboardingStepParseError(pub String);

impl fmt::Display for OnboardingStepParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid onboarding step: {:?}", self.0)
    }
}

impl std::error::Error for OnboardingStepParseError {}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A user's profile document as exchanged with the remote store.
///
/// Every field is optional. When used as a merge patch, `None` means "leave
/// the stored value untouched".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_archetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,
    /// Unix timestamp in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pantry_last_updated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive_inactive_opens: Option<u32>,
}

impl ProfileDocument {
    /// Apply `patch` on top of this document. Fields absent from the patch
    /// keep their current value.
    pub fn merge(&mut self, patch: &ProfileDocument) {
        if let Some(archetype) = &patch.onboarding_archetype {
            self.onboarding_archetype = Some(archetype.clone());
        }
        if let Some(completed) = patch.onboarding_completed {
            self.onboarding_completed = Some(completed);
        }
        if let Some(ts) = patch.pantry_last_updated {
            self.pantry_last_updated = Some(ts);
        }
        if let Some(opens) = patch.consecutive_inactive_opens {
            self.consecutive_inactive_opens = Some(opens);
        }
    }

    /// Whether the document records a completed onboarding.
    ///
    /// Older profiles only carry the chosen archetype, so its presence also
    /// counts as completion.
    pub fn marks_onboarding_complete(&self) -> bool {
        self.onboarding_completed == Some(true) || self.onboarding_archetype.is_some()
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row in the `profiles` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: String,
    pub onboarding_archetype: Option<String>,
    pub onboarding_completed: bool,
    pub pantry_last_updated: Option<i64>,
    pub consecutive_inactive_opens: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for ProfileDocument {
    fn from(row: ProfileRow) -> Self {
        Self {
            onboarding_archetype: row.onboarding_archetype,
            onboarding_completed: Some(row.onboarding_completed),
            pantry_last_updated: row.pantry_last_updated,
            consecutive_inactive_opens: Some(u32::try_from(row.consecutive_inactive_opens).unwrap_or(0)),
        }
    }
}
