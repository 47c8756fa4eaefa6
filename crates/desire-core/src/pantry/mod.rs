//! Pantry synchronization.
//!
//! The remote document store is the source of truth; [`PantryMirror`] is a
//! local copy of it. A write goes to the remote store first and reaches the
//! mirror only after the remote call succeeds, so the mirror never shows an
//! item the remote store does not have. Results are applied only if the user
//! who started the write is still signed in.

pub mod compare;
pub(crate) mod locks;
pub mod mirror;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use desire_db::models::ProfileDocument;

use crate::error::{RemoteOp, SessionError};
use crate::session::SessionState;
use crate::store::DocumentStore;

pub use compare::{PantryComparison, compare_ingredients};
pub use mirror::{PantryMirror, normalize_item_name};

use locks::KeyLocks;

pub struct PantrySynchronizer {
    state: Arc<SessionState>,
    docs: Arc<dyn DocumentStore>,
    locks: KeyLocks,
}

impl PantrySynchronizer {
    pub fn new(state: Arc<SessionState>, docs: Arc<dyn DocumentStore>) -> Self {
        Self {
            state,
            docs,
            locks: KeyLocks::new(),
        }
    }

    /// Add one item. Returns the normalized name.
    pub async fn add_item(&self, raw: &str) -> Result<String, SessionError> {
        let (user_id, epoch) = self.state.require_identity()?;
        let name = normalize_item_name(raw).ok_or(SessionError::EmptyItemName)?;

        let _guard = self.locks.acquire(&name).await;
        self.docs
            .upsert_pantry_item(&user_id, &name)
            .await
            .map_err(SessionError::remote(RemoteOp::UpsertItem))?;

        let now = Utc::now();
        let applied = self.state.apply_if_current(epoch, |s| {
            s.pantry.insert(name.clone());
            s.session.pantry_last_synced_at = Some(now);
        });
        if applied {
            info!(item = %name, "pantry item added");
            self.touch_profile(&user_id, now).await;
        } else {
            debug!(item = %name, "session changed during add; mirror untouched");
        }
        Ok(name)
    }

    /// Remove one item. Removing an item the pantry does not hold succeeds.
    pub async fn remove_item(&self, raw: &str) -> Result<String, SessionError> {
        let (user_id, epoch) = self.state.require_identity()?;
        let name = normalize_item_name(raw).ok_or(SessionError::EmptyItemName)?;

        let _guard = self.locks.acquire(&name).await;
        self.docs
            .delete_pantry_item(&user_id, &name)
            .await
            .map_err(SessionError::remote(RemoteOp::DeleteItem))?;

        let now = Utc::now();
        let applied = self.state.apply_if_current(epoch, |s| {
            s.pantry.remove(&name);
            s.session.pantry_last_synced_at = Some(now);
        });
        if applied {
            info!(item = %name, "pantry item removed");
            self.touch_profile(&user_id, now).await;
        } else {
            debug!(item = %name, "session changed during remove; mirror untouched");
        }
        Ok(name)
    }

    /// Upsert every name and, if all succeed, make the mirror exactly that
    /// set. Returns the normalized names in sorted order.
    ///
    /// When any upsert fails the mirror is left as it was and
    /// [`SessionError::PartialBulk`] reports which names failed. Upserts that
    /// succeeded stay in the remote store.
    pub async fn replace_all<S: AsRef<str>>(
        &self,
        raw: &[S],
    ) -> Result<Vec<String>, SessionError> {
        let (user_id, epoch) = self.state.require_identity()?;
        let names = raw
            .iter()
            .map(|r| normalize_item_name(r.as_ref()).ok_or(SessionError::EmptyItemName))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let _guards = self.locks.acquire_all(names.iter().map(String::as_str)).await;
        let results = join_all(
            names
                .iter()
                .map(|name| self.docs.upsert_pantry_item(&user_id, name)),
        )
        .await;

        let total = names.len();
        let mut failed = Vec::new();
        let mut first_error = None;
        for (name, result) in names.iter().zip(results) {
            if let Err(e) = result {
                failed.push(name.clone());
                first_error.get_or_insert(e);
            }
        }
        if let Some(source) = first_error {
            warn!(failed = failed.len(), total, "bulk pantry write incomplete");
            return Err(SessionError::PartialBulk {
                failed,
                total,
                source,
            });
        }

        let now = Utc::now();
        let items: Vec<String> = names.iter().cloned().collect();
        let applied = self.state.apply_if_current(epoch, |s| {
            s.pantry.replace(names);
            s.session.pantry_last_synced_at = Some(now);
        });
        if applied {
            info!(items = total, "pantry replaced");
            self.touch_profile(&user_id, now).await;
        } else {
            debug!("session changed during bulk write; mirror untouched");
        }
        Ok(items)
    }

    /// Mirror the pantry timestamp into the profile. Failure is logged only.
    async fn touch_profile(&self, user_id: &str, at: DateTime<Utc>) {
        let patch = ProfileDocument {
            pantry_last_updated: Some(at.timestamp_millis()),
            ..Default::default()
        };
        if let Err(e) = self.docs.merge_profile(user_id, &patch).await {
            warn!(user_id, error = %e, "failed to record pantry update time on profile");
        }
    }
}
