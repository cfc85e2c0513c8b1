//! In-process remote store for exercising the fallback and sync paths.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::store::{ListFilter, RemoteError, RemoteStore};
use crate::records::Record;

pub struct MemoryRemote {
  rows: Mutex<Vec<Record>>,
  reachable: AtomicBool,
  latency: Mutex<Duration>,
  requests: AtomicUsize,
}

impl MemoryRemote {
  pub fn new(rows: Vec<Record>) -> Self {
    Self {
      rows: Mutex::new(rows),
      reachable: AtomicBool::new(true),
      latency: Mutex::new(Duration::ZERO),
      requests: AtomicUsize::new(0),
    }
  }

  pub fn set_reachable(&self, reachable: bool) {
    self.reachable.store(reachable, Ordering::SeqCst);
  }

  pub fn set_latency(&self, latency: Duration) {
    *self.latency.lock().unwrap() = latency;
  }

  /// Number of calls made against this store, reachable or not.
  pub fn requests(&self) -> usize {
    self.requests.load(Ordering::SeqCst)
  }

  pub fn rows(&self) -> Vec<Record> {
    self.rows.lock().unwrap().clone()
  }

  /// Write a row directly, as another session would.
  pub fn put(&self, record: Record) {
    crate::records::upsert(&mut self.rows.lock().unwrap(), record);
  }

  /// Count the request and snapshot state before any simulated latency, so a
  /// slow response carries the data as it was when the request was made.
  async fn begin(&self) -> Result<Vec<Record>, RemoteError> {
    self.requests.fetch_add(1, Ordering::SeqCst);
    let reachable = self.reachable.load(Ordering::SeqCst);
    let snapshot = self.rows();
    let latency = *self.latency.lock().unwrap();
    if !latency.is_zero() {
      tokio::time::sleep(latency).await;
    }
    if reachable {
      Ok(snapshot)
    } else {
      Err(RemoteError::Server {
        status: 503,
        body: "unreachable".to_string(),
      })
    }
  }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
  async fn list(&self, filter: &ListFilter) -> Result<Vec<Record>, RemoteError> {
    let rows = self.begin().await?;
    Ok(rows.into_iter().filter(|r| filter.matches(r)).collect())
  }

  async fn get_by_id(&self, id: &str) -> Result<Option<Record>, RemoteError> {
    let rows = self.begin().await?;
    Ok(rows.into_iter().find(|r| r.id == id))
  }

  async fn get_by_slug(&self, slug: &str) -> Result<Option<Record>, RemoteError> {
    let rows = self.begin().await?;
    Ok(rows.into_iter().find(|r| r.slug == slug))
  }

  async fn insert(&self, record: &Record) -> Result<Record, RemoteError> {
    self.begin().await?;
    self.put(record.clone());
    Ok(record.clone())
  }

  async fn update(&self, record: &Record) -> Result<Option<Record>, RemoteError> {
    let rows = self.begin().await?;
    if !rows.iter().any(|r| r.id == record.id) {
      return Ok(None);
    }
    self.put(record.clone());
    Ok(Some(record.clone()))
  }

  async fn delete(&self, id: &str) -> Result<bool, RemoteError> {
    self.begin().await?;
    let mut rows = self.rows.lock().unwrap();
    let before = rows.len();
    rows.retain(|r| r.id != id);
    Ok(rows.len() != before)
  }
}
