//! Slug and identifier derivation.

use chrono::Utc;

use super::types::Record;

/// Derive a URL-safe slug from a display name.
///
/// ASCII letters and digits are kept (lowercased); every other run of
/// characters becomes a single `-`.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  let mut pending_dash = false;

  for c in name.chars() {
    if c.is_ascii_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(c.to_ascii_lowercase());
    } else {
      pending_dash = true;
    }
  }

  if slug.is_empty() {
    "listing".to_string()
  } else {
    slug
  }
}

/// Return `base`, or the first of `base-2`, `base-3`, ... not yet taken.
pub fn unique_slug(base: &str, taken: impl Fn(&str) -> bool) -> String {
  if !taken(base) {
    return base.to_string();
  }
  (2u32..)
    .map(|n| format!("{}-{}", base, n))
    .find(|candidate| !taken(candidate))
    .unwrap_or_else(|| base.to_string())
}

/// Time-based identifier (Unix milliseconds), bumped past any collision.
pub fn next_id(existing: &[Record]) -> String {
  let mut candidate = Utc::now().timestamp_millis();
  while existing.iter().any(|r| r.id == candidate.to_string()) {
    candidate += 1;
  }
  candidate.to_string()
}
