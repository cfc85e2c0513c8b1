//! Record client with transparent fallback to the local cache.
//!
//! The remote store is the system of record when it answers. When it is
//! unconfigured or a call fails, reads are served from the local cache (or
//! the built-in seed when the cache is empty) and writes are applied to the
//! cached collection so the working set stays consistent with what the user
//! already sees.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::store::{ListFilter, RemoteStore};
use crate::cache::{Fetched, LocalCache};
use crate::error::SyncError;
use crate::records::{
  self, next_id, slugify, unique_slug, Comment, ListingStatus, NewRecord, Record, RecordPatch,
  ValidationError, Vote,
};

#[derive(Clone)]
pub struct RecordClient {
  remote: Option<Arc<dyn RemoteStore>>,
  cache: LocalCache,
}

impl RecordClient {
  /// Create a client. `remote` is `None` when the remote store is
  /// unconfigured; every call then goes straight to the cache.
  pub fn new(remote: Option<Arc<dyn RemoteStore>>, cache: LocalCache) -> Self {
    Self { remote, cache }
  }

  pub fn cache(&self) -> &LocalCache {
    &self.cache
  }

  pub fn is_remote_configured(&self) -> bool {
    self.remote.is_some()
  }

  /// List records for display.
  ///
  /// 1. Ask the remote store; an unfiltered answer is mirrored into the cache
  /// 2. On failure (or no remote), serve the cache, seeding it if empty
  /// 3. Apply the filter, audience rule and display order either way
  pub async fn list(&self, filter: &ListFilter) -> Fetched<Vec<Record>> {
    if let Some(remote) = &self.remote {
      match remote.list(filter).await {
        Ok(rows) => {
          let rows = records::sanitize(rows);
          if filter.is_unfiltered() {
            self.cache.write(&rows);
          }
          return Fetched::from_remote(filter.apply(rows));
        }
        Err(e) => warn!(error = %e, "remote list failed, serving local cache"),
      }
    }

    self.cache.load().map(|rows| filter.apply(rows))
  }

  /// The full collection, unordered, from whichever tier answers.
  async fn collection(&self) -> Fetched<Vec<Record>> {
    if let Some(remote) = &self.remote {
      match remote.list(&ListFilter::admin()).await {
        Ok(rows) => return Fetched::from_remote(records::sanitize(rows)),
        Err(e) => warn!(error = %e, "remote collection fetch failed, using local cache"),
      }
    }
    self.cache.load()
  }

  pub async fn get_by_id(&self, id: &str) -> Result<Fetched<Record>, SyncError> {
    if let Some(remote) = &self.remote {
      match remote.get_by_id(id).await {
        Ok(found) => {
          return accept_remote(found).ok_or_else(|| SyncError::not_found_id(id));
        }
        Err(e) => warn!(id, error = %e, "remote lookup failed, searching local cache"),
      }
    }

    self
      .find_cached(|r| r.id == id)
      .ok_or_else(|| SyncError::not_found_id(id))
  }

  pub async fn get_by_slug(&self, slug: &str) -> Result<Fetched<Record>, SyncError> {
    if let Some(remote) = &self.remote {
      match remote.get_by_slug(slug).await {
        Ok(found) => {
          return accept_remote(found).ok_or_else(|| SyncError::not_found_slug(slug));
        }
        Err(e) => warn!(slug, error = %e, "remote lookup failed, searching local cache"),
      }
    }

    self
      .find_cached(|r| r.slug == slug)
      .ok_or_else(|| SyncError::not_found_slug(slug))
  }

  fn find_cached(&self, predicate: impl Fn(&Record) -> bool) -> Option<Fetched<Record>> {
    let loaded = self.cache.load();
    let source = loaded.source;
    loaded
      .data
      .into_iter()
      .find(|r| predicate(r))
      .map(|record| Fetched {
        data: record,
        source,
      })
  }

  /// Admin "add": the listing is live immediately.
  pub async fn create(&self, new: NewRecord) -> Result<Record, SyncError> {
    self.intake(new, ListingStatus::Approved).await
  }

  /// Public submission: stored as pending until an admin approves it.
  pub async fn submit(&self, new: NewRecord) -> Result<Record, SyncError> {
    self.intake(new, ListingStatus::Pending).await
  }

  async fn intake(&self, new: NewRecord, status: ListingStatus) -> Result<Record, SyncError> {
    let mut collection = self.collection().await;

    let id = match new.id.as_deref().map(str::trim) {
      Some(id) if !id.is_empty() => {
        if collection.data.iter().any(|r| r.id == id) {
          return Err(ValidationError::DuplicateId(id.to_string()).into());
        }
        id.to_string()
      }
      _ => next_id(&collection.data),
    };

    let base = match new.slug.as_deref() {
      Some(slug) if !slug.trim().is_empty() => slugify(slug),
      _ => slugify(&new.name),
    };
    let slug = unique_slug(&base, |s| collection.data.iter().any(|r| r.slug == s));

    let now = Utc::now();
    let mut record = new.into_record(id, slug, status);
    record.created_at = Some(now);
    record.updated_at = Some(now);
    record.validate()?;

    if let Some(remote) = &self.remote {
      match remote.insert(&record).await {
        Ok(stored) => match stored.validate() {
          Ok(()) => record = stored,
          Err(e) => warn!(error = %e, "remote returned an invalid row, keeping local copy"),
        },
        Err(e) => warn!(id = %record.id, error = %e, "remote insert failed, keeping local copy"),
      }
    }

    records::upsert(&mut collection.data, record.clone());
    self.cache.write(&collection.data);
    info!(id = %record.id, slug = %record.slug, status = ?record.status, "record created");

    Ok(record)
  }

  /// Shallow-merge `patch` onto the record with `id`.
  pub async fn update(&self, id: &str, patch: RecordPatch) -> Result<Record, SyncError> {
    self.modify(id, move |record| patch.apply(record)).await
  }

  pub async fn vote(&self, id: &str, vote: Vote) -> Result<Record, SyncError> {
    self
      .modify(id, move |record| {
        match vote {
          Vote::Up => record.upvotes = record.upvotes.saturating_add(1),
          Vote::Down => record.downvotes = record.downvotes.saturating_add(1),
        }
        false
      })
      .await
  }

  pub async fn comment(&self, id: &str, author: &str, body: &str) -> Result<Record, SyncError> {
    let comment = Comment {
      author: author.trim().to_string(),
      body: body.trim().to_string(),
      created_at: Utc::now(),
    };
    self
      .modify(id, move |record| {
        record.comments.push(comment);
        false
      })
      .await
  }

  /// Read-modify-write of one record. `change` returns whether the display
  /// name changed, in which case the slug is re-derived.
  async fn modify(
    &self,
    id: &str,
    change: impl FnOnce(&mut Record) -> bool,
  ) -> Result<Record, SyncError> {
    let mut collection = self.collection().await;
    let mut record = collection
      .data
      .iter()
      .find(|r| r.id == id)
      .cloned()
      .ok_or_else(|| SyncError::not_found_id(id))?;

    if change(&mut record) {
      let base = slugify(&record.name);
      record.slug = unique_slug(&base, |s| {
        collection.data.iter().any(|r| r.slug == s && r.id != id)
      });
    }
    record.updated_at = Some(Utc::now());
    record.validate()?;

    if let Some(remote) = &self.remote {
      match remote.update(&record).await {
        Ok(Some(stored)) if stored.validate().is_ok() => record = stored,
        Ok(Some(_)) => warn!(id, "remote returned an invalid row, keeping local copy"),
        Ok(None) => warn!(id, "record missing remotely, keeping local copy"),
        Err(e) => warn!(id, error = %e, "remote update failed, keeping local copy"),
      }
    }

    records::upsert(&mut collection.data, record.clone());
    self.cache.write(&collection.data);
    debug!(id, source = %collection.source, "record updated");

    Ok(record)
  }

  /// Remove a record from the directory.
  pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
    let mut collection = self.collection().await;
    let before = collection.data.len();
    collection.data.retain(|r| r.id != id);
    if collection.data.len() == before {
      return Err(SyncError::not_found_id(id));
    }

    if let Some(remote) = &self.remote {
      if let Err(e) = remote.delete(id).await {
        warn!(id, error = %e, "remote delete failed, removing locally only");
      }
    }

    self.cache.write(&collection.data);
    info!(id, "record removed");
    Ok(())
  }
}

fn accept_remote(found: Option<Record>) -> Option<Fetched<Record>> {
  let record = found?;
  match record.validate() {
    Ok(()) => {
      let mut sanitized = records::sanitize(vec![record]);
      sanitized.pop().map(Fetched::from_remote)
    }
    Err(e) => {
      warn!(error = %e, "ignoring invalid remote record");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{KeyValueStore, MemoryStore, Source, DEFAULT_KEY};
  use crate::records::{seed_records, Availability, RecordKind};
  use crate::remote::memory::MemoryRemote;

  fn jane() -> Record {
    let mut record = Record::new("1", "Jane Doe", RecordKind::Recruiter);
    record.title = Some("Principal Recruiter".to_string());
    record.category = "Engineering".to_string();
    record.availability = Some(Availability {
      accepting: true,
      next_available: Some("2026-11-01".to_string()),
    });
    record
  }

  fn hireflow() -> Record {
    let mut record = Record::new("2", "HireFlow AI", RecordKind::Tool);
    record.category = "AI, Sourcing".to_string();
    record
  }

  fn local_cache() -> LocalCache {
    LocalCache::new(Arc::new(MemoryStore::new()), DEFAULT_KEY)
  }

  fn online(rows: Vec<Record>) -> (RecordClient, Arc<MemoryRemote>) {
    let remote = Arc::new(MemoryRemote::new(rows));
    let client = RecordClient::new(Some(remote.clone()), local_cache());
    (client, remote)
  }

  fn offline(cached: &[Record]) -> RecordClient {
    let cache = local_cache();
    cache.write(cached);
    RecordClient::new(None, cache)
  }

  #[tokio::test]
  async fn test_list_from_remote_mirrors_cache() {
    let (client, _remote) = online(vec![jane(), hireflow()]);

    let listed = client.list(&ListFilter::default()).await;

    assert_eq!(listed.source, Source::Remote);
    assert_eq!(listed.data.len(), 2);
    assert_eq!(client.cache().read(), vec![jane(), hireflow()]);
  }

  #[tokio::test]
  async fn test_filtered_list_does_not_overwrite_cache() {
    let (client, _remote) = online(vec![jane(), hireflow()]);
    client.cache().write(&[jane(), hireflow()]);

    let listed = client
      .list(&ListFilter::default().with_kind(RecordKind::Tool))
      .await;

    assert_eq!(listed.data, vec![hireflow()]);
    assert_eq!(client.cache().read().len(), 2);
  }

  #[tokio::test]
  async fn test_unreachable_list_equals_cache() {
    let (client, remote) = online(vec![jane()]);
    let cached = vec![jane(), hireflow()];
    client.cache().write(&cached);
    remote.set_reachable(false);

    let listed = client.list(&ListFilter::admin()).await;

    assert_eq!(listed.source, Source::Cache);
    assert_eq!(listed.data, client.cache().read());
  }

  #[tokio::test]
  async fn test_unconfigured_with_empty_cache_serves_seed() {
    let client = offline(&[]);

    let listed = client.list(&ListFilter::admin()).await;

    assert_eq!(listed.source, Source::Seed);
    let mut expected = seed_records();
    records::order_for_display(&mut expected);
    assert_eq!(listed.data, expected);
  }

  #[tokio::test]
  async fn test_public_list_hides_hidden_and_orders_featured() {
    let mut hidden = jane();
    hidden.hidden = true;
    hidden.featured = true;
    let mut featured = hireflow();
    featured.featured = true;
    let plain = Record::new("3", "Plain Listing", RecordKind::Recruiter);
    let (client, _remote) = online(vec![plain.clone(), hidden, featured.clone()]);

    let listed = client.list(&ListFilter::default()).await;

    assert_eq!(listed.data, vec![featured, plain]);
  }

  #[tokio::test]
  async fn test_get_missing_id_is_not_found_both_ways() {
    let (client, remote) = online(vec![jane()]);
    let err = client.get_by_id("does-not-exist").await.unwrap_err();
    assert!(err.is_not_found());

    remote.set_reachable(false);
    let err = client.get_by_id("does-not-exist").await.unwrap_err();
    assert!(err.is_not_found());

    let err = offline(&[jane()]).get_by_slug("nobody").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(crate::error::Lookup::Slug(_))));
  }

  #[tokio::test]
  async fn test_get_falls_back_to_cache() {
    let (client, remote) = online(vec![]);
    client.cache().write(&[jane()]);
    remote.set_reachable(false);

    let found = client.get_by_slug("jane-doe").await.unwrap();
    assert_eq!(found.source, Source::Cache);
    assert_eq!(found.data.id, "1");
  }

  #[tokio::test]
  async fn test_create_derives_slug() {
    let (client, remote) = online(vec![]);

    let record = client
      .create(NewRecord::new("Jane Doe", RecordKind::Recruiter))
      .await
      .unwrap();

    assert_eq!(record.slug, "jane-doe");
    assert_eq!(record.status, ListingStatus::Approved);
    assert!(record.created_at.is_some());
    assert!(record.id.parse::<i64>().is_ok());
    assert_eq!(remote.rows(), vec![record.clone()]);
    assert_eq!(client.cache().read(), vec![record]);
  }

  #[tokio::test]
  async fn test_create_disambiguates_slug_collision() {
    let (client, _remote) = online(vec![jane()]);

    let record = client
      .create(NewRecord::new("Jane  Doe!", RecordKind::Recruiter))
      .await
      .unwrap();

    assert_eq!(record.slug, "jane-doe-2");
  }

  #[tokio::test]
  async fn test_create_rejects_blank_name_and_duplicate_id() {
    let (client, _remote) = online(vec![jane()]);

    let err = client
      .create(NewRecord::new("   ", RecordKind::Tool))
      .await
      .unwrap_err();
    assert!(matches!(err, SyncError::Invalid(ValidationError::EmptyName(_))));

    let mut duplicate = NewRecord::new("Someone", RecordKind::Tool);
    duplicate.id = Some("1".to_string());
    let err = client.create(duplicate).await.unwrap_err();
    assert!(matches!(err, SyncError::Invalid(ValidationError::DuplicateId(_))));
  }

  #[tokio::test]
  async fn test_create_while_unreachable_mirrors_locally() {
    let (client, remote) = online(vec![]);
    client.cache().write(&[jane()]);
    remote.set_reachable(false);

    let record = client
      .create(NewRecord::new("HireFlow AI", RecordKind::Tool))
      .await
      .unwrap();

    assert!(remote.rows().is_empty());
    let cached = client.cache().read();
    assert_eq!(cached.len(), 2);
    assert!(cached.contains(&record));
  }

  #[tokio::test]
  async fn test_submit_is_pending_and_not_public() {
    let (client, _remote) = online(vec![]);

    let record = client
      .submit(NewRecord::new("New Recruiter", RecordKind::Recruiter))
      .await
      .unwrap();

    assert_eq!(record.status, ListingStatus::Pending);
    assert!(client.list(&ListFilter::default()).await.data.is_empty());
    assert_eq!(client.list(&ListFilter::admin()).await.data.len(), 1);
  }

  #[tokio::test]
  async fn test_update_is_shallow_merge() {
    let (client, _remote) = online(vec![jane()]);
    let before = jane();

    let patch = RecordPatch {
      featured: Some(true),
      category: Some("Engineering, AI".to_string()),
      ..RecordPatch::default()
    };
    client.update("1", patch).await.unwrap();

    let after = client.get_by_id("1").await.unwrap().data;
    assert!(after.featured);
    assert_eq!(after.category, "Engineering, AI");
    assert_eq!(after.name, before.name);
    assert_eq!(after.title, before.title);
    assert_eq!(after.availability, before.availability);
    assert_eq!(after.slug, before.slug);
  }

  #[tokio::test]
  async fn test_independent_updates_do_not_clobber() {
    let (client, _remote) = online(vec![jane()]);

    client.update("1", RecordPatch::featured(true)).await.unwrap();
    client.update("1", RecordPatch::hidden(true)).await.unwrap();

    let record = client.get_by_id("1").await.unwrap().data;
    assert!(record.featured);
    assert!(record.hidden);
  }

  #[tokio::test]
  async fn test_rename_recomputes_slug() {
    let (client, _remote) = online(vec![jane(), hireflow()]);

    let patch = RecordPatch {
      name: Some("HireFlow AI".to_string()),
      ..RecordPatch::default()
    };
    let record = client.update("1", patch).await.unwrap();

    assert_eq!(record.slug, "hireflow-ai-2");
  }

  #[tokio::test]
  async fn test_update_unknown_id_is_not_found() {
    let (client, _remote) = online(vec![jane()]);
    let err = client
      .update("404", RecordPatch::hidden(true))
      .await
      .unwrap_err();
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn test_update_while_unreachable_applies_to_cache() {
    let (client, remote) = online(vec![jane()]);
    client.cache().write(&[jane()]);
    remote.set_reachable(false);

    client.update("1", RecordPatch::hidden(true)).await.unwrap();

    assert!(client.cache().read()[0].hidden);
    assert!(!remote.rows()[0].hidden);
  }

  #[tokio::test]
  async fn test_votes_and_comments_accumulate() {
    let (client, _remote) = online(vec![jane()]);

    client.vote("1", Vote::Up).await.unwrap();
    client.vote("1", Vote::Up).await.unwrap();
    client.vote("1", Vote::Down).await.unwrap();
    let record = client.comment("1", "alex", " Great recruiter ").await.unwrap();

    assert_eq!(record.upvotes, 2);
    assert_eq!(record.downvotes, 1);
    assert_eq!(record.score(), 1);
    assert_eq!(record.comments.len(), 1);
    assert_eq!(record.comments[0].body, "Great recruiter");
  }

  #[tokio::test]
  async fn test_remove() {
    let (client, remote) = online(vec![jane(), hireflow()]);

    client.remove("1").await.unwrap();

    assert_eq!(remote.rows(), vec![hireflow()]);
    assert_eq!(client.cache().read(), vec![hireflow()]);
    assert!(client.remove("1").await.unwrap_err().is_not_found());
  }

  #[tokio::test]
  async fn test_malformed_cache_with_unconfigured_remote_serves_seed() {
    let store = Arc::new(MemoryStore::new());
    store.set(DEFAULT_KEY, "definitely not json").unwrap();
    let client = RecordClient::new(None, LocalCache::new(store, DEFAULT_KEY));

    let listed = client.list(&ListFilter::admin()).await;
    assert_eq!(listed.source, Source::Seed);
    assert!(!client.is_remote_configured());
  }
}
