//! Built-in directory shown when neither the remote store nor the local
//! cache has anything to offer.

use super::types::{Availability, Record, RecordKind, SocialProof};

struct SeedEntry {
  id: &'static str,
  kind: RecordKind,
  name: &'static str,
  title: &'static str,
  company: &'static str,
  category: &'static str,
  location: &'static str,
  description: &'static str,
  featured: bool,
  rating: f64,
  review_count: u32,
}

const SEED: &[SeedEntry] = &[
  SeedEntry {
    id: "seed-1",
    kind: RecordKind::Recruiter,
    name: "Sarah Chen",
    title: "Senior Technical Recruiter",
    company: "TalentBridge",
    category: "Engineering, AI",
    location: "San Francisco, CA",
    description: "Places ML and platform engineers at Series A to C startups.",
    featured: true,
    rating: 4.9,
    review_count: 127,
  },
  SeedEntry {
    id: "seed-2",
    kind: RecordKind::Recruiter,
    name: "Marcus Johnson",
    title: "Executive Search Partner",
    company: "Summit Executive",
    category: "Executive, Finance",
    location: "New York, NY",
    description: "C-suite and VP searches for fintech and asset management.",
    featured: false,
    rating: 4.7,
    review_count: 89,
  },
  SeedEntry {
    id: "seed-3",
    kind: RecordKind::Recruiter,
    name: "Priya Raman",
    title: "Healthcare Recruiting Lead",
    company: "CareStaff",
    category: "Healthcare",
    location: "Remote",
    description: "Clinical and health-tech hiring across North America.",
    featured: false,
    rating: 4.6,
    review_count: 54,
  },
  SeedEntry {
    id: "seed-4",
    kind: RecordKind::Tool,
    name: "HireFlow AI",
    title: "AI sourcing assistant",
    company: "HireFlow",
    category: "Sourcing, AI",
    location: "Remote",
    description: "Ranks candidate profiles against a job description and drafts outreach.",
    featured: true,
    rating: 4.5,
    review_count: 212,
  },
  SeedEntry {
    id: "seed-5",
    kind: RecordKind::Tool,
    name: "ScreenSense",
    title: "Automated phone screening",
    company: "ScreenSense Labs",
    category: "Screening, AI",
    location: "Austin, TX",
    description: "Runs structured first-round screens and summarises them for recruiters.",
    featured: false,
    rating: 4.2,
    review_count: 66,
  },
];

/// The default collection, in display order.
pub fn seed_records() -> Vec<Record> {
  SEED
    .iter()
    .map(|entry| {
      let mut record = Record::new(entry.id, entry.name, entry.kind);
      record.title = Some(entry.title.to_string());
      record.company = Some(entry.company.to_string());
      record.category = entry.category.to_string();
      record.location = Some(entry.location.to_string());
      record.description = Some(entry.description.to_string());
      record.featured = entry.featured;
      record.rating = entry.rating;
      record.review_count = entry.review_count;
      if entry.kind == RecordKind::Recruiter {
        record.availability = Some(Availability {
          accepting: true,
          next_available: None,
        });
        record.social_proof = Some(SocialProof {
          placements: Some(entry.review_count * 2),
          years_experience: None,
          testimonial: None,
        });
      }
      record
    })
    .collect()
}
