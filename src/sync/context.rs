//! Shared state handed to every component of a session.
//!
//! An [`Origin`] is the storage all sessions share (the same SQLite file, or
//! the same in-memory store in tests) plus the channel its caches announce
//! writes on. A [`SyncContext`] is one session ("tab") on that origin: its own event
//! bus, its own working set, and a record client bound to the shared storage.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::cache::{KeyValueStore, LocalCache, Source, StorageChange};
use crate::event::{ComponentId, EventBus, TabId};
use crate::records::{Audience, Record};
use crate::remote::{ListFilter, RecordClient, RemoteStore};

const STORAGE_CHANGE_CAPACITY: usize = 64;

pub struct Origin {
  store: Arc<dyn KeyValueStore>,
  changes: broadcast::Sender<StorageChange>,
  next_tab: AtomicU64,
}

impl Origin {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Arc<Self> {
    let (changes, _rx) = broadcast::channel(STORAGE_CHANGE_CAPACITY);
    Arc::new(Self {
      store,
      changes,
      next_tab: AtomicU64::new(1),
    })
  }

  pub fn store(&self) -> Arc<dyn KeyValueStore> {
    Arc::clone(&self.store)
  }

  /// A cache on this origin whose writes are announced as coming from `tab`.
  pub fn cache(&self, key: impl Into<String>, tab: TabId) -> LocalCache {
    LocalCache::new(self.store(), key).announcing(self.changes.clone(), tab)
  }

  pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
    self.changes.subscribe()
  }

  fn next_tab(&self) -> TabId {
    TabId(self.next_tab.fetch_add(1, Ordering::Relaxed))
  }
}

/// Outcome of offering a collection to the working set.
#[derive(Debug)]
pub enum Applied {
  /// A newer result was already applied; this one was dropped
  Stale,
  /// Same contents as before
  Unchanged,
  /// The working set now holds these records
  Changed(Arc<[Record]>),
}

/// The collection a session currently considers current.
#[derive(Debug)]
pub struct WorkingSet {
  records: Arc<[Record]>,
  source: Source,
  fingerprint: String,
  applied: u64,
}

impl Default for WorkingSet {
  fn default() -> Self {
    Self {
      records: Arc::from(Vec::<Record>::new()),
      source: Source::default(),
      fingerprint: fingerprint(&[]),
      applied: 0,
    }
  }
}

/// Content hash of a collection, used to skip no-op refreshes.
pub fn fingerprint(records: &[Record]) -> String {
  let mut hasher = Sha256::new();
  match serde_json::to_vec(records) {
    Ok(bytes) => hasher.update(&bytes),
    // Unserializable contents never compare equal to anything
    Err(_) => hasher.update(records.len().to_le_bytes()),
  }
  hex::encode(hasher.finalize())
}

impl WorkingSet {
  pub fn records(&self) -> Arc<[Record]> {
    Arc::clone(&self.records)
  }

  pub fn source(&self) -> Source {
    self.source
  }

  pub fn applied_ticket(&self) -> u64 {
    self.applied
  }

  /// Replace the contents if `ticket` is newer than the last applied one.
  pub fn apply(&mut self, ticket: u64, records: Vec<Record>, source: Source) -> Applied {
    if ticket <= self.applied {
      return Applied::Stale;
    }
    self.applied = ticket;
    self.source = source;

    let fingerprint = fingerprint(&records);
    if fingerprint == self.fingerprint {
      return Applied::Unchanged;
    }

    self.fingerprint = fingerprint;
    self.records = Arc::from(records);
    Applied::Changed(self.records())
  }
}

struct ContextInner {
  tab: TabId,
  origin: Arc<Origin>,
  client: RecordClient,
  bus: EventBus,
  working_set: Mutex<WorkingSet>,
  tickets: AtomicU64,
  next_component: AtomicU64,
}

/// Explicit per-session context. Cheap to clone.
#[derive(Clone)]
pub struct SyncContext {
  inner: Arc<ContextInner>,
}

impl SyncContext {
  /// Open a new session on `origin`. `remote` is `None` when unconfigured.
  pub fn new(
    origin: Arc<Origin>,
    remote: Option<Arc<dyn RemoteStore>>,
    cache_key: impl Into<String>,
  ) -> Self {
    let tab = origin.next_tab();
    let cache = origin.cache(cache_key, tab);
    let client = RecordClient::new(remote, cache);
    Self {
      inner: Arc::new(ContextInner {
        tab,
        origin,
        client,
        bus: EventBus::new(),
        working_set: Mutex::new(WorkingSet::default()),
        tickets: AtomicU64::new(0),
        next_component: AtomicU64::new(1),
      }),
    }
  }

  pub fn tab(&self) -> TabId {
    self.inner.tab
  }

  pub fn origin(&self) -> &Arc<Origin> {
    &self.inner.origin
  }

  pub fn client(&self) -> &RecordClient {
    &self.inner.client
  }

  pub fn cache(&self) -> &LocalCache {
    self.inner.client.cache()
  }

  pub fn bus(&self) -> &EventBus {
    &self.inner.bus
  }

  /// Allocate an id for a component publishing on this session's bus.
  pub fn component_id(&self) -> ComponentId {
    ComponentId(self.inner.next_component.fetch_add(1, Ordering::Relaxed))
  }

  /// Take a request ticket. Tickets are ordered by when the request was
  /// issued, not when it completes.
  pub fn next_ticket(&self) -> u64 {
    self.inner.tickets.fetch_add(1, Ordering::SeqCst) + 1
  }

  /// Lock the working set. A poisoned lock is recovered: the working set is
  /// always replaced wholesale, so it is never left half-written.
  pub fn working_set(&self) -> MutexGuard<'_, WorkingSet> {
    self
      .inner
      .working_set
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// The whole working set and the tier it came from.
  pub fn snapshot(&self) -> (Arc<[Record]>, Source) {
    let set = self.working_set();
    (set.records(), set.source())
  }

  /// Working set as a given audience should see it.
  pub fn records(&self, audience: Audience) -> Vec<Record> {
    let (records, _) = self.snapshot();
    let filter = ListFilter {
      audience,
      ..ListFilter::default()
    };
    filter.apply(records.to_vec())
  }
}
