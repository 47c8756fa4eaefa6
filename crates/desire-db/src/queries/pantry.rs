//! Database query functions for the `pantry_items` table.
//!
//! Item names are expected to be normalized by the caller; the table key is
//! `(user_id, name)`.

use anyhow::{Context, Result};
use sqlx::PgPool;

/// List the names of every item in a user's pantry, sorted by name.
pub async fn list_item_names(pool: &PgPool, user_id: &str) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM pantry_items WHERE user_id = $1 ORDER BY name")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .with_context(|| format!("failed to list pantry for user {user_id}"))?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Insert an item, or leave the existing row in place if it is already
/// present.
pub async fn upsert_item(pool: &PgPool, user_id: &str, name: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO pantry_items (user_id, name) VALUES ($1, $2) \
         ON CONFLICT (user_id, name) DO NOTHING",
    )
    .bind(user_id)
    .bind(name)
    .execute(pool)
    .await
    .with_context(|| format!("failed to upsert pantry item {name:?} for user {user_id}"))?;

    Ok(())
}

/// Delete an item. Deleting an item that does not exist succeeds and
/// returns `false`.
pub async fn delete_item(pool: &PgPool, user_id: &str, name: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM pantry_items WHERE user_id = $1 AND name = $2")
        .bind(user_id)
        .bind(name)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete pantry item {name:?} for user {user_id}"))?;

    Ok(result.rows_affected() > 0)
}
