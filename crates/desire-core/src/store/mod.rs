//! Collaborator interfaces the engine depends on.
//!
//! The engine never talks to a concrete backend: local persistence, the
//! remote document store, the identity provider and the app lifecycle
//! source all sit behind the object-safe traits in this module so that
//! production adapters and in-memory test doubles are interchangeable.

pub mod file;
pub mod memory;
pub mod postgres;

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use tracing::debug;

use desire_db::models::ProfileDocument;

pub use file::FileKeyValueStore;
pub use memory::{
    ManualIdentityProvider, ManualLifecycleSource, MemoryDocumentStore, MemoryKeyValueStore,
    StaticIdentityProvider,
};
pub use postgres::PgDocumentStore;

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Foreground state of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    Active,
    Inactive,
    Background,
}

impl AppLifecycle {
    /// `true` for the two states that are not in the foreground.
    pub fn is_away(self) -> bool {
        matches!(self, Self::Inactive | Self::Background)
    }
}

impl fmt::Display for AppLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Background => "background",
        };
        f.write_str(s)
    }
}

/// Durable string-to-string storage on the device.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Per-user remote documents: one profile plus one record per pantry item.
///
/// Pantry item names passed to and returned from this trait are normalized.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileDocument>>;

    /// Merge the fields present in `patch` into the stored profile, creating
    /// it when absent. Fields not present in the patch are left alone.
    async fn merge_profile(&self, user_id: &str, patch: &ProfileDocument) -> Result<()>;

    async fn list_pantry(&self, user_id: &str) -> Result<Vec<String>>;

    async fn upsert_pantry_item(&self, user_id: &str, name: &str) -> Result<()>;

    /// Deleting an item that does not exist succeeds.
    async fn delete_pantry_item(&self, user_id: &str, name: &str) -> Result<()>;
}

/// Source of identity changes. `None` means signed out.
pub trait IdentityProvider: Send + Sync {
    fn subscribe(&self) -> Subscription<Option<Identity>>;
}

/// Source of app foreground/background transitions.
pub trait LifecycleSource: Send + Sync {
    fn subscribe(&self) -> Subscription<AppLifecycle>;
}

const _: () = {
    fn _assert_object_safe(
        _: &dyn KeyValueStore,
        _: &dyn DocumentStore,
        _: &dyn IdentityProvider,
        _: &dyn LifecycleSource,
    ) {
    }
};

/// A live subscription to one of the event sources.
///
/// Events are read through [`Stream`]. Dropping the handle releases the
/// subscription with the underlying source.
pub struct Subscription<T> {
    source: &'static str,
    events: Pin<Box<dyn Stream<Item = T> + Send>>,
}

impl<T> Subscription<T> {
    pub fn new(source: &'static str, events: impl Stream<Item = T> + Send + 'static) -> Self {
        debug!(source, "subscription opened");
        Self {
            source,
            events: Box::pin(events),
        }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.events.as_mut().poll_next(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        debug!(source = self.source, "subscription released");
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
