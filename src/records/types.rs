//! Directory record types shared by every layer.
//!
//! These are the shapes stored in the remote collection, mirrored into the
//! local cache and broadcast between sessions. Field names are snake_case on
//! the wire in both places.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Current record schema version. Rows from a newer schema are rejected.
pub const SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
  SCHEMA_VERSION
}

/// SQL `NULL` in a non-optional column means the column's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_schema_version<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(SCHEMA_VERSION))
}

/// Ids arrive as text or as integers (bigint keys, millisecond timestamps).
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
  }

  Ok(match RawId::deserialize(deserializer)? {
    RawId::Text(id) => id,
    RawId::Unsigned(id) => id.to_string(),
    RawId::Signed(id) => id.to_string(),
  })
}

/// What a listing describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
  #[default]
  Recruiter,
  Tool,
}

impl RecordKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      RecordKind::Recruiter => "recruiter",
      RecordKind::Tool => "tool",
    }
  }
}

impl std::str::FromStr for RecordKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "recruiter" | "recruiters" => Ok(RecordKind::Recruiter),
      "tool" | "tools" => Ok(RecordKind::Tool),
      other => Err(format!("unknown listing kind '{}'", other)),
    }
  }
}

/// Intake status. Public submissions start as `Pending` until an admin
/// approves them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
  Pending,
  // Rows written before intake existed carry no status.
  #[default]
  Approved,
  Rejected,
}

impl ListingStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ListingStatus::Pending => "pending",
      ListingStatus::Approved => "approved",
      ListingStatus::Rejected => "rejected",
    }
  }
}

/// Direction of an engagement vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
  Up,
  Down,
}

impl std::str::FromStr for Vote {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "up" | "+" | "+1" => Ok(Vote::Up),
      "down" | "-" | "-1" => Ok(Vote::Down),
      other => Err(format!("unknown vote '{}', expected up or down", other)),
    }
  }
}

/// Who is reading a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Audience {
  /// End-user views: hidden and unapproved records are filtered out
  #[default]
  Public,
  /// Admin panels see everything
  Admin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Availability {
  #[serde(default)]
  pub accepting: bool,
  #[serde(default)]
  pub next_available: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialProof {
  #[serde(default)]
  pub placements: Option<u32>,
  #[serde(default)]
  pub years_experience: Option<u32>,
  #[serde(default)]
  pub testimonial: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
  pub author: String,
  pub body: String,
  pub created_at: DateTime<Utc>,
}

/// A single directory entry (recruiter or tool listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  #[serde(default = "schema_version", deserialize_with = "null_as_schema_version")]
  pub schema_version: u32,
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub kind: RecordKind,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub slug: String,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub company: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  /// Single tag, or several joined with commas
  #[serde(default, deserialize_with = "null_as_default")]
  pub category: String,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub website: Option<String>,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub hidden: bool,
  #[serde(default, deserialize_with = "null_as_default")]
  pub featured: bool,
  #[serde(default, deserialize_with = "null_as_default")]
  pub status: ListingStatus,
  #[serde(default, deserialize_with = "null_as_default")]
  pub rating: f64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub review_count: u32,
  #[serde(default, deserialize_with = "null_as_default")]
  pub upvotes: u32,
  #[serde(default, deserialize_with = "null_as_default")]
  pub downvotes: u32,
  #[serde(default, deserialize_with = "null_as_default")]
  pub comments: Vec<Comment>,
  #[serde(default)]
  pub availability: Option<Availability>,
  #[serde(default)]
  pub social_proof: Option<SocialProof>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

/// Reasons a record is refused at the store boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("record id is empty")]
  EmptyId,
  #[error("record '{0}' has an empty name")]
  EmptyName(String),
  #[error("record '{id}' uses schema version {version}, newest supported is {SCHEMA_VERSION}")]
  UnsupportedSchema { id: String, version: u32 },
  #[error("record '{id}' has rating {rating} outside 0..=5")]
  RatingOutOfRange { id: String, rating: f64 },
  #[error("a record with id '{0}' already exists")]
  DuplicateId(String),
}

impl Record {
  /// Bare record with defaults for everything but identity.
  pub fn new(id: impl Into<String>, name: impl Into<String>, kind: RecordKind) -> Self {
    let name = name.into();
    Self {
      schema_version: SCHEMA_VERSION,
      id: id.into(),
      kind,
      slug: super::slugify(&name),
      name,
      title: None,
      company: None,
      description: None,
      category: String::new(),
      location: None,
      website: None,
      image: None,
      hidden: false,
      featured: false,
      status: ListingStatus::Approved,
      rating: 0.0,
      review_count: 0,
      upvotes: 0,
      downvotes: 0,
      comments: Vec::new(),
      availability: None,
      social_proof: None,
      created_at: None,
      updated_at: None,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.id.trim().is_empty() {
      return Err(ValidationError::EmptyId);
    }
    if self.name.trim().is_empty() {
      return Err(ValidationError::EmptyName(self.id.clone()));
    }
    if self.schema_version > SCHEMA_VERSION {
      return Err(ValidationError::UnsupportedSchema {
        id: self.id.clone(),
        version: self.schema_version,
      });
    }
    if !(0.0..=5.0).contains(&self.rating) {
      return Err(ValidationError::RatingOutOfRange {
        id: self.id.clone(),
        rating: self.rating,
      });
    }
    Ok(())
  }

  /// Category tags, split on commas and trimmed.
  pub fn categories(&self) -> impl Iterator<Item = &str> {
    self
      .category
      .split(',')
      .map(str::trim)
      .filter(|c| !c.is_empty())
  }

  pub fn has_category(&self, wanted: &str) -> bool {
    let wanted = wanted.trim();
    self.categories().any(|c| c.eq_ignore_ascii_case(wanted))
  }

  /// Visible to end users: not hidden and approved.
  pub fn is_public(&self) -> bool {
    !self.hidden && self.status == ListingStatus::Approved
  }

  pub fn visible_to(&self, audience: Audience) -> bool {
    match audience {
      Audience::Public => self.is_public(),
      Audience::Admin => true,
    }
  }

  pub fn score(&self) -> i64 {
    i64::from(self.upvotes) - i64::from(self.downvotes)
  }
}

/// Intake payload for a new listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
  #[serde(default)]
  pub id: Option<String>,
  pub name: String,
  #[serde(default)]
  pub slug: Option<String>,
  #[serde(default)]
  pub kind: RecordKind,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub company: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub website: Option<String>,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub featured: bool,
  #[serde(default)]
  pub hidden: bool,
  #[serde(default)]
  pub availability: Option<Availability>,
  #[serde(default)]
  pub social_proof: Option<SocialProof>,
}

impl NewRecord {
  pub fn new(name: impl Into<String>, kind: RecordKind) -> Self {
    Self {
      name: name.into(),
      kind,
      ..Self::default()
    }
  }

  /// Build the stored record. Identity, slug and timestamps are assigned by
  /// the caller.
  pub fn into_record(self, id: String, slug: String, status: ListingStatus) -> Record {
    Record {
      schema_version: SCHEMA_VERSION,
      id,
      kind: self.kind,
      name: self.name.trim().to_string(),
      slug,
      title: self.title,
      company: self.company,
      description: self.description,
      category: self.category,
      location: self.location,
      website: self.website,
      image: self.image,
      hidden: self.hidden,
      featured: self.featured,
      status,
      rating: 0.0,
      review_count: 0,
      upvotes: 0,
      downvotes: 0,
      comments: Vec::new(),
      availability: self.availability,
      social_proof: self.social_proof,
      created_at: None,
      updated_at: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_legacy_row_defaults() {
    let json = r#"{"id": "17", "name": "Jane Doe"}"#;
    let record: Record = serde_json::from_str(json).unwrap();

    assert_eq!(record.schema_version, SCHEMA_VERSION);
    assert_eq!(record.kind, RecordKind::Recruiter);
    assert_eq!(record.status, ListingStatus::Approved);
    assert!(!record.hidden);
    assert!(record.slug.is_empty());
  }

  #[test]
  fn test_validate_rejects_newer_schema() {
    let mut record = Record::new("1", "Jane", RecordKind::Recruiter);
    record.schema_version = SCHEMA_VERSION + 1;
    assert!(matches!(
      record.validate(),
      Err(ValidationError::UnsupportedSchema { .. })
    ));
  }

  #[test]
  fn test_validate_rejects_blank_name_and_id() {
    let record = Record::new("1", "   ", RecordKind::Tool);
    assert_eq!(
      record.validate(),
      Err(ValidationError::EmptyName("1".to_string()))
    );

    let record = Record::new("", "Jane", RecordKind::Tool);
    assert_eq!(record.validate(), Err(ValidationError::EmptyId));
  }

  #[test]
  fn test_comma_joined_categories() {
    let mut record = Record::new("1", "Jane", RecordKind::Recruiter);
    record.category = "Engineering, AI ,,Sales".to_string();

    let tags: Vec<&str> = record.categories().collect();
    assert_eq!(tags, vec!["Engineering", "AI", "Sales"]);
    assert!(record.has_category("ai"));
    assert!(!record.has_category("design"));
  }

  #[test]
  fn test_visibility_by_audience() {
    let mut record = Record::new("1", "Jane", RecordKind::Recruiter);
    assert!(record.visible_to(Audience::Public));

    record.status = ListingStatus::Pending;
    assert!(!record.visible_to(Audience::Public));
    assert!(record.visible_to(Audience::Admin));

    record.status = ListingStatus::Approved;
    record.hidden = true;
    assert!(!record.visible_to(Audience::Public));
    assert!(record.visible_to(Audience::Admin));
  }

  #[test]
  fn test_kind_parsing() {
    assert_eq!("Tools".parse::<RecordKind>(), Ok(RecordKind::Tool));
    assert!("agency".parse::<RecordKind>().is_err());
  }

  #[test]
  fn test_null_columns_take_defaults() {
    let row = serde_json::json!({
      "id": -42,
      "name": "Signed",
      "schema_version": null,
      "upvotes": null,
      "kind": null
    });
    let record: Record = serde_json::from_value(row).unwrap();

    assert_eq!(record.id, "-42");
    assert_eq!(record.schema_version, SCHEMA_VERSION);
    assert_eq!(record.upvotes, 0);
    assert_eq!(record.kind, RecordKind::Recruiter);
    assert!(record.validate().is_ok());
  }
}
