//! The remote record collection as a capability.

use async_trait::async_trait;
use thiserror::Error;

use crate::records::{order_for_display, Audience, Record, RecordKind};

/// Transport-level failures. These never reach UI code: the client logs them
/// and serves the local cache instead.
#[derive(Error, Debug)]
pub enum RemoteError {
  #[error("remote store is not configured")]
  Unconfigured,
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("server returned {status}: {body}")]
  Server { status: u16, body: String },
  #[error("malformed response: {0}")]
  Decode(String),
}

/// CRUD over the remote record collection.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  /// List records. Implementations may narrow server-side with the filter;
  /// the audience rule and ordering are applied by the caller.
  async fn list(&self, filter: &ListFilter) -> Result<Vec<Record>, RemoteError>;

  async fn get_by_id(&self, id: &str) -> Result<Option<Record>, RemoteError>;

  async fn get_by_slug(&self, slug: &str) -> Result<Option<Record>, RemoteError>;

  /// Insert a record, returning the row as stored.
  async fn insert(&self, record: &Record) -> Result<Record, RemoteError>;

  /// Replace the stored row with the same id. `None` when no such row exists.
  async fn update(&self, record: &Record) -> Result<Option<Record>, RemoteError>;

  /// Delete by id. Returns whether a row was removed.
  async fn delete(&self, id: &str) -> Result<bool, RemoteError>;
}

/// Narrowing applied to list reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
  /// Case-insensitive match against any comma-joined category tag
  pub category: Option<String>,
  pub slug: Option<String>,
  pub kind: Option<RecordKind>,
  pub audience: Audience,
}

impl ListFilter {
  /// Everything, including hidden and unapproved records.
  pub fn admin() -> Self {
    Self {
      audience: Audience::Admin,
      ..Self::default()
    }
  }

  pub fn with_category(mut self, category: impl Into<String>) -> Self {
    self.category = Some(category.into());
    self
  }

  pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
    self.slug = Some(slug.into());
    self
  }

  pub fn with_kind(mut self, kind: RecordKind) -> Self {
    self.kind = Some(kind);
    self
  }

  /// True when the filter selects the whole collection.
  pub fn is_unfiltered(&self) -> bool {
    self.category.is_none() && self.slug.is_none() && self.kind.is_none()
  }

  pub fn matches(&self, record: &Record) -> bool {
    if !record.visible_to(self.audience) {
      return false;
    }
    if let Some(category) = &self.category {
      if !record.has_category(category) {
        return false;
      }
    }
    if let Some(slug) = &self.slug {
      if &record.slug != slug {
        return false;
      }
    }
    if let Some(kind) = self.kind {
      if record.kind != kind {
        return false;
      }
    }
    true
  }

  /// Filter and order records for display.
  pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
    let mut kept: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();
    order_for_display(&mut kept);
    kept
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::records::ListingStatus;

  fn records() -> Vec<Record> {
    let mut jane = Record::new("1", "Jane Doe", RecordKind::Recruiter);
    jane.category = "Engineering, AI".to_string();
    let mut hidden = Record::new("2", "Hidden Person", RecordKind::Recruiter);
    hidden.hidden = true;
    hidden.featured = true;
    let mut pending = Record::new("3", "Pending Tool", RecordKind::Tool);
    pending.status = ListingStatus::Pending;
    let mut tool = Record::new("4", "HireFlow AI", RecordKind::Tool);
    tool.category = "AI".to_string();
    tool.featured = true;
    vec![jane, hidden, pending, tool]
  }

  #[test]
  fn test_public_filter_excludes_hidden_and_pending() {
    let listed = ListFilter::default().apply(records());
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["4", "1"]);
  }

  #[test]
  fn test_admin_sees_everything_featured_first() {
    let listed = ListFilter::admin().apply(records());
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "4", "1", "3"]);
  }

  #[test]
  fn test_category_kind_and_slug_filters() {
    let ai = ListFilter::default().with_category("ai").apply(records());
    assert_eq!(ai.len(), 2);

    let tools = ListFilter::admin().with_kind(RecordKind::Tool).apply(records());
    assert!(tools.iter().all(|r| r.kind == RecordKind::Tool));
    assert_eq!(tools.len(), 2);

    let jane = ListFilter::default().with_slug("jane-doe").apply(records());
    assert_eq!(jane.len(), 1);
    assert!(!ListFilter::default().with_slug("jane-doe").is_unfiltered());
  }
}
