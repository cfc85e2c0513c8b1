//! Caller-visible outcomes.
//!
//! Transport and storage failures are absorbed inside the sync layer and
//! never appear here; only a missing record or a refused intake does.

use std::fmt;
use thiserror::Error;

use crate::records::ValidationError;

/// How a record was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
  Id(String),
  Slug(String),
}

impl fmt::Display for Lookup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Lookup::Id(id) => write!(f, "id '{}'", id),
      Lookup::Slug(slug) => write!(f, "slug '{}'", slug),
    }
  }
}

#[derive(Error, Debug)]
pub enum SyncError {
  #[error("no record with {0}")]
  NotFound(Lookup),
  #[error("invalid record: {0}")]
  Invalid(#[from] ValidationError),
}

impl SyncError {
  pub fn not_found_id(id: &str) -> Self {
    SyncError::NotFound(Lookup::Id(id.to_string()))
  }

  pub fn not_found_slug(slug: &str) -> Self {
    SyncError::NotFound(Lookup::Slug(slug.to_string()))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, SyncError::NotFound(_))
  }
}
