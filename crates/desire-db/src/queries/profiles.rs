//! Database query functions for the `profiles` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::{ProfileDocument, ProfileRow};

/// Fetch a user's profile row.
pub async fn get_profile(pool: &PgPool, user_id: &str) -> Result<Option<ProfileRow>> {
    let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to fetch profile for user {user_id}"))?;

    Ok(row)
}

/// Merge `patch` into the user's profile, creating the row if it does not
/// exist. Fields that are `None` in the patch keep their stored value.
///
/// Returns the profile as stored after the merge.
pub async fn merge_profile(
    pool: &PgPool,
    user_id: &str,
    patch: &ProfileDocument,
) -> Result<ProfileRow> {
    let opens = patch
        .consecutive_inactive_opens
        .map(i32::try_from)
        .transpose()
        .context("consecutive_inactive_opens out of range")?;

    let row = sqlx::query_as::<_, ProfileRow>(
        "INSERT INTO profiles \
             (user_id, onboarding_archetype, onboarding_completed, pantry_last_updated, consecutive_inactive_opens) \
         VALUES ($1, $2, COALESCE($3, FALSE), $4, COALESCE($5, 0)) \
         ON CONFLICT (user_id) DO UPDATE SET \
             onboarding_archetype = COALESCE($2, profiles.onboarding_archetype), \
             onboarding_completed = COALESCE($3, profiles.onboarding_completed), \
             pantry_last_updated = COALESCE($4, profiles.pantry_last_updated), \
             consecutive_inactive_opens = COALESCE($5, profiles.consecutive_inactive_opens), \
             updated_at = now() \
         RETURNING *",
    )
    .bind(user_id)
    .bind(patch.onboarding_archetype.as_deref())
    .bind(patch.onboarding_completed)
    .bind(patch.pantry_last_updated)
    .bind(opens)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to merge profile for user {user_id}"))?;

    Ok(row)
}
