//! In-process collaborator implementations.
//!
//! Used by the interactive shell and throughout the test suite. The document
//! store can be told to fail specific operations, and the two event sources
//! are driven by hand.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

use desire_db::models::ProfileDocument;

use super::{
    AppLifecycle, DocumentStore, Identity, IdentityProvider, KeyValueStore, LifecycleSource,
    Subscription,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Key-value store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail until switched back off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Read a value without going through the async trait.
    pub fn value(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("key-value store rejected write of {key:?}");
        }
        lock(&self.values).insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Documents {
    profiles: HashMap<String, ProfileDocument>,
    pantries: HashMap<String, BTreeSet<String>>,
}

#[derive(Debug, Default)]
struct Faults {
    reads: bool,
    profile_writes: bool,
    item_writes: bool,
    items: HashSet<String>,
}

/// A document store held in memory.
///
/// Besides plain storage it records how many write calls were made and can
/// inject failures or hold reads open, which lets tests reproduce partial
/// writes and late hydration results.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    docs: Mutex<Documents>,
    faults: Mutex<Faults>,
    writes: AtomicUsize,
    reads_waiting: AtomicUsize,
    reads_paused: watch::Sender<bool>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self {
            docs: Mutex::default(),
            faults: Mutex::default(),
            writes: AtomicUsize::new(0),
            reads_waiting: AtomicUsize::new(0),
            reads_paused: watch::Sender::new(false),
        }
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_profile(&self, user_id: &str, doc: ProfileDocument) {
        lock(&self.docs).profiles.insert(user_id.to_owned(), doc);
    }

    pub fn seed_pantry<I, S>(&self, user_id: &str, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.docs)
            .pantries
            .entry(user_id.to_owned())
            .or_default()
            .extend(names.into_iter().map(Into::into));
    }

    pub fn profile(&self, user_id: &str) -> Option<ProfileDocument> {
        lock(&self.docs).profiles.get(user_id).cloned()
    }

    pub fn pantry(&self, user_id: &str) -> BTreeSet<String> {
        lock(&self.docs)
            .pantries
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of write calls attempted, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        lock(&self.faults).reads = fail;
    }

    pub fn fail_profile_writes(&self, fail: bool) {
        lock(&self.faults).profile_writes = fail;
    }

    /// Fail every pantry upsert and delete.
    pub fn fail_item_writes(&self, fail: bool) {
        lock(&self.faults).item_writes = fail;
    }

    /// Fail upserts and deletes of one specific item name.
    pub fn fail_item(&self, name: &str) {
        lock(&self.faults).items.insert(name.to_owned());
    }

    /// Block reads until [`resume_reads`](Self::resume_reads) is called.
    pub fn pause_reads(&self) {
        self.reads_paused.send_replace(true);
    }

    pub fn resume_reads(&self) {
        self.reads_paused.send_replace(false);
    }

    /// Reads currently blocked by [`pause_reads`](Self::pause_reads).
    pub fn reads_waiting(&self) -> usize {
        self.reads_waiting.load(Ordering::SeqCst)
    }

    async fn gate_read(&self) -> Result<()> {
        let mut paused = self.reads_paused.subscribe();
        if *paused.borrow() {
            self.reads_waiting.fetch_add(1, Ordering::SeqCst);
            let waited = paused.wait_for(|p| !*p).await.map(|_| ());
            self.reads_waiting.fetch_sub(1, Ordering::SeqCst);
            waited?;
        }
        if lock(&self.faults).reads {
            bail!("document store unavailable");
        }
        Ok(())
    }

    fn check_item_write(&self, name: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let faults = lock(&self.faults);
        if faults.item_writes || faults.items.contains(name) {
            bail!("document store rejected write of pantry item {name:?}");
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileDocument>> {
        self.gate_read().await?;
        Ok(lock(&self.docs).profiles.get(user_id).cloned())
    }

    async fn merge_profile(&self, user_id: &str, patch: &ProfileDocument) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if lock(&self.faults).profile_writes {
            bail!("document store rejected profile update for {user_id}");
        }
        lock(&self.docs)
            .profiles
            .entry(user_id.to_owned())
            .or_default()
            .merge(patch);
        Ok(())
    }

    async fn list_pantry(&self, user_id: &str) -> Result<Vec<String>> {
        self.gate_read().await?;
        Ok(self.pantry(user_id).into_iter().collect())
    }

    async fn upsert_pantry_item(&self, user_id: &str, name: &str) -> Result<()> {
        self.check_item_write(name)?;
        lock(&self.docs)
            .pantries
            .entry(user_id.to_owned())
            .or_default()
            .insert(name.to_owned());
        Ok(())
    }

    async fn delete_pantry_item(&self, user_id: &str, name: &str) -> Result<()> {
        self.check_item_write(name)?;
        if let Some(items) = lock(&self.docs).pantries.get_mut(user_id) {
            items.remove(name);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Identity providers
// ---------------------------------------------------------------------------

/// Identity provider driven by explicit sign-in and sign-out calls.
///
/// Subscribers receive the latest identity on subscription and each change
/// after it. Nothing is delivered until the first call, so the engine stays
/// in its loading state until then.
#[derive(Debug)]
pub struct ManualIdentityProvider {
    current: watch::Sender<Option<Option<Identity>>>,
}

impl Default for ManualIdentityProvider {
    fn default() -> Self {
        Self {
            current: watch::Sender::new(None),
        }
    }
}

impl ManualIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, identity: Identity) {
        self.current.send_replace(Some(Some(identity)));
    }

    pub fn sign_out(&self) {
        self.current.send_replace(Some(None));
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.current.receiver_count()
    }
}

impl IdentityProvider for ManualIdentityProvider {
    fn subscribe(&self) -> Subscription<Option<Identity>> {
        let changes = WatchStream::new(self.current.subscribe()).filter_map(|known| known);
        Subscription::new("identity", changes)
    }
}

/// Identity provider that reports one fixed identity and then goes quiet.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    identity: Option<Identity>,
}

impl StaticIdentityProvider {
    pub fn new(identity: Option<Identity>) -> Self {
        Self { identity }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn subscribe(&self) -> Subscription<Option<Identity>> {
        Subscription::new("identity", tokio_stream::once(self.identity.clone()))
    }
}

// ---------------------------------------------------------------------------
// Lifecycle source
// ---------------------------------------------------------------------------

const LIFECYCLE_CAPACITY: usize = 32;

/// Lifecycle source driven by explicit [`emit`](Self::emit) calls.
///
/// Transitions emitted while nobody is subscribed are dropped.
#[derive(Debug)]
pub struct ManualLifecycleSource {
    tx: broadcast::Sender<AppLifecycle>,
}

impl Default for ManualLifecycleSource {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(LIFECYCLE_CAPACITY);
        Self { tx }
    }
}

impl ManualLifecycleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, state: AppLifecycle) {
        // No subscribers is not an error.
        let _ = self.tx.send(state);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl LifecycleSource for ManualLifecycleSource {
    fn subscribe(&self) -> Subscription<AppLifecycle> {
        let events = BroadcastStream::new(self.tx.subscribe()).filter_map(|event| event.ok());
        Subscription::new("lifecycle", events)
    }
}
