//! Opening a signed-in session for one-shot commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;

use desire_core::store::{FileKeyValueStore, PgDocumentStore};
use desire_core::{SessionContext, SessionError};

use crate::config::DesireConfig;

/// Wire a [`SessionContext`] to the local state file and the database, load
/// the saved onboarding step, then sign in the configured user and hydrate.
pub async fn open(pool: &PgPool, config: &DesireConfig) -> Result<SessionContext> {
    let user_id = config.require_user()?;
    let ctx = SessionContext::new(
        Arc::new(FileKeyValueStore::new(&config.state_path)),
        Arc::new(PgDocumentStore::new(pool.clone())),
    );
    if let Err(e) = ctx.onboarding.hydrate().await {
        tracing::warn!(error = %e, "failed to load saved onboarding step");
    }
    ctx.sign_in(user_id)
        .await
        .map_err(user_facing)
        .with_context(|| format!("failed to load session for {user_id}"))?;
    Ok(ctx)
}

/// Convert a session error into an `anyhow` error whose top line is the
/// message a user would see.
pub fn user_facing(e: SessionError) -> anyhow::Error {
    let message = e.user_message();
    anyhow::Error::new(e).context(message)
}
