//! Directory record schema and the pure helpers every layer shares.

mod patch;
mod seed;
mod slug;
mod types;

pub use patch::RecordPatch;
pub use seed::seed_records;
pub use slug::{next_id, slugify, unique_slug};
pub use types::{
  Audience, Availability, Comment, ListingStatus, NewRecord, Record, RecordKind, SocialProof,
  ValidationError, Vote, SCHEMA_VERSION,
};

use std::collections::HashSet;
use tracing::warn;

/// Validate records arriving from outside the working set.
///
/// Invalid records are dropped, a missing slug is derived from the name and
/// repeated ids keep their first occurrence.
pub fn sanitize(records: Vec<Record>) -> Vec<Record> {
  let mut seen = HashSet::new();
  let mut kept = Vec::with_capacity(records.len());

  for mut record in records {
    if let Err(e) = record.validate() {
      warn!(error = %e, "dropping invalid record");
      continue;
    }
    if !seen.insert(record.id.clone()) {
      warn!(id = %record.id, "dropping duplicate record id");
      continue;
    }
    if record.slug.trim().is_empty() {
      record.slug = slugify(&record.name);
    }
    kept.push(record);
  }

  kept
}

/// Featured records first; otherwise the incoming order is kept.
pub fn order_for_display(records: &mut [Record]) {
  records.sort_by_key(|r| !r.featured);
}

/// Insert `record`, replacing any record with the same id in place.
pub fn upsert(records: &mut Vec<Record>, record: Record) {
  match records.iter_mut().find(|r| r.id == record.id) {
    Some(existing) => *existing = record,
    None => records.push(record),
  }
}
