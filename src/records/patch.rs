//! Partial updates.
//!
//! Merging is shallow: a field present in the patch replaces the stored
//! value wholesale. Nested objects (`availability`, `social_proof`) and the
//! comment list are never merged field by field.

use serde::{Deserialize, Deserializer, Serialize};

use super::types::{Availability, Comment, ListingStatus, Record, RecordKind, SocialProof};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<RecordKind>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub title: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub company: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub description: Option<Option<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub location: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub website: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub image: Option<Option<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hidden: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub featured: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<ListingStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rating: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub review_count: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub upvotes: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub downvotes: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comments: Option<Vec<Comment>>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub availability: Option<Option<Availability>>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub social_proof: Option<Option<SocialProof>>,
}

fn set<T>(slot: &mut T, value: Option<T>) {
  if let Some(value) = value {
    *slot = value;
  }
}

impl RecordPatch {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }

  pub fn hidden(hidden: bool) -> Self {
    Self {
      hidden: Some(hidden),
      ..Self::default()
    }
  }

  pub fn featured(featured: bool) -> Self {
    Self {
      featured: Some(featured),
      ..Self::default()
    }
  }

  pub fn status(status: ListingStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }

  /// Apply onto `record`. Returns true when the display name changed.
  pub fn apply(self, record: &mut Record) -> bool {
    let name_changed = match self.name {
      Some(name) => {
        let name = name.trim().to_string();
        let changed = name != record.name;
        record.name = name;
        changed
      }
      None => false,
    };

    set(&mut record.kind, self.kind);
    set(&mut record.title, self.title);
    set(&mut record.company, self.company);
    set(&mut record.description, self.description);
    set(&mut record.category, self.category);
    set(&mut record.location, self.location);
    set(&mut record.website, self.website);
    set(&mut record.image, self.image);
    set(&mut record.hidden, self.hidden);
    set(&mut record.featured, self.featured);
    set(&mut record.status, self.status);
    set(&mut record.rating, self.rating);
    set(&mut record.review_count, self.review_count);
    set(&mut record.upvotes, self.upvotes);
    set(&mut record.downvotes, self.downvotes);
    set(&mut record.comments, self.comments);
    set(&mut record.availability, self.availability);
    set(&mut record.social_proof, self.social_proof);

    name_changed
  }
}
