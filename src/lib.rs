//! Offline-tolerant storage and cross-session sync for a recruiter and
//! AI-tool directory.

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod records;
pub mod remote;
pub mod sync;

pub use cache::{Fetched, Source};
pub use error::{Lookup, SyncError};
pub use event::{EventBus, SyncEvent, TabId, Trigger};
pub use records::{Audience, NewRecord, Record, RecordKind, RecordPatch, Vote};
pub use remote::{ListFilter, RecordClient};
pub use sync::{Coordinator, ListingFeed, Origin, Phase, SyncContext};
