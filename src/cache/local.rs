//! The local record cache: one JSON array under a fixed storage key.
//!
//! Nothing here returns an error. Storage and serialization failures are
//! logged and degrade to "absent" on read and "no-op" on write.
//!
//! A cache bound to a session announces every successful write and clear to
//! the other sessions sharing the store, whichever code path made it.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use super::storage::KeyValueStore;
use super::traits::Fetched;
use crate::event::TabId;
use crate::records::{self, seed_records, Record};

/// Default storage key for the record collection.
pub const DEFAULT_KEY: &str = "recruitdir.records";

/// A write to shared storage, as seen by the other sessions.
#[derive(Debug, Clone)]
pub struct StorageChange {
  pub key: String,
  /// New value, or `None` when the key was removed
  pub new_value: Option<String>,
  /// Session that made the change
  pub tab: TabId,
}

#[derive(Clone)]
struct Announcer {
  changes: broadcast::Sender<StorageChange>,
  tab: TabId,
}

#[derive(Clone)]
pub struct LocalCache {
  store: Arc<dyn KeyValueStore>,
  key: String,
  announcer: Option<Announcer>,
}

impl LocalCache {
  pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
    Self {
      store,
      key: key.into(),
      announcer: None,
    }
  }

  /// Announce every successful write and clear on `changes` as coming from
  /// `tab`.
  pub fn announcing(mut self, changes: broadcast::Sender<StorageChange>, tab: TabId) -> Self {
    self.announcer = Some(Announcer { changes, tab });
    self
  }

  fn announce(&self, new_value: Option<String>) {
    let Some(announcer) = &self.announcer else {
      return;
    };
    let delivered = announcer
      .changes
      .send(StorageChange {
        key: self.key.clone(),
        new_value,
        tab: announcer.tab,
      })
      .unwrap_or(0);
    trace!(key = %self.key, tab = %announcer.tab, delivered, "storage change announced");
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  /// Read the persisted collection; empty when absent or unreadable.
  pub fn read(&self) -> Vec<Record> {
    match self.store.get(&self.key) {
      Ok(Some(raw)) => Self::parse(&raw),
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!(key = %self.key, error = %e, "failed to read local cache");
        Vec::new()
      }
    }
  }

  /// Decode a persisted collection. Anything but a JSON array yields an empty
  /// list; elements that fail to decode or validate are skipped.
  pub fn parse(raw: &str) -> Vec<Record> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
      Ok(value) => value,
      Err(e) => {
        warn!(error = %e, "local cache holds malformed JSON");
        return Vec::new();
      }
    };

    let serde_json::Value::Array(items) = value else {
      warn!("local cache value is not an array");
      return Vec::new();
    };

    let decoded = items
      .into_iter()
      .filter_map(|item| match serde_json::from_value::<Record>(item) {
        Ok(record) => Some(record),
        Err(e) => {
          warn!(error = %e, "skipping undecodable cached record");
          None
        }
      })
      .collect();

    records::sanitize(decoded)
  }

  /// Persist `records`, replacing the previous collection.
  pub fn write(&self, records: &[Record]) {
    let raw = match serde_json::to_string(records) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(error = %e, "failed to serialize records for local cache");
        return;
      }
    };
    self.write_raw(&raw);
  }

  /// Persist an already serialized collection.
  pub fn write_raw(&self, raw: &str) {
    match self.store.set(&self.key, raw) {
      Ok(()) => {
        debug!(key = %self.key, bytes = raw.len(), "local cache written");
        self.announce(Some(raw.to_string()));
      }
      Err(e) => warn!(key = %self.key, error = %e, "failed to write local cache"),
    }
  }

  /// Remove the persisted collection.
  pub fn clear(&self) {
    match self.store.remove(&self.key) {
      Ok(()) => self.announce(None),
      Err(e) => warn!(key = %self.key, error = %e, "failed to clear local cache"),
    }
  }

  /// The cached collection, or the built-in seed when the cache is empty.
  ///
  /// Serving the seed also writes it, so the cache is initialised on first
  /// use.
  pub fn load(&self) -> Fetched<Vec<Record>> {
    let cached = self.read();
    if !cached.is_empty() {
      return Fetched::from_cache(cached);
    }

    let seed = seed_records();
    debug!(count = seed.len(), "local cache empty, initialising with seed data");
    self.write(&seed);
    Fetched::from_seed(seed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStore;
  use crate::cache::Source;
  use crate::records::RecordKind;

  fn cache_with(store: Arc<dyn KeyValueStore>) -> LocalCache {
    LocalCache::new(store, DEFAULT_KEY)
  }

  fn sample() -> Vec<Record> {
    let mut jane = Record::new("1", "Jane Doe", RecordKind::Recruiter);
    jane.category = "Engineering, AI".to_string();
    jane.featured = true;
    vec![jane, Record::new("2", "HireFlow AI", RecordKind::Tool)]
  }

  #[test]
  fn test_write_then_read_round_trip() {
    let cache = cache_with(Arc::new(MemoryStore::new()));
    let records = sample();

    cache.write(&records);
    assert_eq!(cache.read(), records);
  }

  #[test]
  fn test_absent_malformed_or_non_array_reads_empty() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(store.clone());
    assert!(cache.read().is_empty());

    store.set(DEFAULT_KEY, "{not json").unwrap();
    assert!(cache.read().is_empty());

    store.set(DEFAULT_KEY, r#"{"id": "1", "name": "Jane"}"#).unwrap();
    assert!(cache.read().is_empty());
  }

  #[test]
  fn test_undecodable_elements_skipped() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(store.clone());
    store
      .set(
        DEFAULT_KEY,
        r#"[{"id": "1", "name": "Jane"}, {"name": "no id"}, 42]"#,
      )
      .unwrap();

    let records = cache.read();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].slug, "jane");
  }

  #[test]
  fn test_failed_write_keeps_previous_value() {
    let records = sample();
    let raw = serde_json::to_string(&records).unwrap();
    let store = Arc::new(MemoryStore::with_quota(DEFAULT_KEY.len() + raw.len()));
    let cache = cache_with(store);

    cache.write(&records);

    let mut larger = records.clone();
    larger.push(Record::new("3", "A listing that no longer fits", RecordKind::Tool));
    cache.write(&larger);

    assert_eq!(cache.read(), records);
  }

  #[test]
  fn test_clear_reverts_to_empty() {
    let cache = cache_with(Arc::new(MemoryStore::new()));
    cache.write(&sample());

    cache.clear();
    assert!(cache.read().is_empty());

    cache.write(&sample());
    assert_eq!(cache.read().len(), 2);
  }

  #[test]
  fn test_load_seeds_empty_cache() {
    let cache = cache_with(Arc::new(MemoryStore::new()));
    cache.write(&[]);

    let loaded = cache.load();
    assert_eq!(loaded.source, Source::Seed);
    assert_eq!(loaded.data, seed_records());

    // Seed is now the cached collection
    let again = cache.load();
    assert_eq!(again.source, Source::Cache);
    assert_eq!(again.data, seed_records());
  }

  #[test]
  fn test_every_write_path_is_announced() {
    let (changes, mut rx) = broadcast::channel(16);
    let cache = cache_with(Arc::new(MemoryStore::new())).announcing(changes, TabId(7));

    // Seeding an empty cache is a write too
    cache.load();
    let seeded = rx.try_recv().unwrap();
    assert_eq!(seeded.tab, TabId(7));
    assert_eq!(seeded.key, DEFAULT_KEY);
    assert_eq!(LocalCache::parse(&seeded.new_value.unwrap()), seed_records());

    cache.write(&sample());
    let written = rx.try_recv().unwrap();
    assert_eq!(LocalCache::parse(&written.new_value.unwrap()), sample());

    cache.clear();
    assert!(rx.try_recv().unwrap().new_value.is_none());
    assert!(rx.try_recv().is_err());
  }

  #[test]
  fn test_failed_write_is_not_announced() {
    let (changes, mut rx) = broadcast::channel(16);
    let store = Arc::new(MemoryStore::with_quota(8));
    let cache = cache_with(store).announcing(changes, TabId(1));

    cache.write(&sample());

    assert!(rx.try_recv().is_err());
  }
}
