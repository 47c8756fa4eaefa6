//! Per-key async locks.
//!
//! Writes to the same pantry item are serialized; writes to different items
//! run concurrently. Entries are removed from the table once nobody holds or
//! waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

type Table = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    table: Mutex<Table>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) async fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let lock = self.table().entry(key.to_owned()).or_default().clone();
        let guard = lock.lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.to_owned(),
            guard: Some(guard),
        }
    }

    /// Acquire several keys. Keys must be given in sorted order so that two
    /// bulk writers cannot deadlock each other.
    pub(crate) async fn acquire_all<'k, I>(&self, keys: I) -> Vec<KeyGuard<'_>>
    where
        I: IntoIterator<Item = &'k str>,
    {
        let mut guards = Vec::new();
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

pub(crate) struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.locks.table();
        if table
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.key);
        }
    }
}
