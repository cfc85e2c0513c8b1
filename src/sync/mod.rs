//! Keeping every session's view of the directory consistent.

mod context;
mod coordinator;
mod feed;

pub use crate::cache::StorageChange;
pub use context::{fingerprint, Applied, Origin, SyncContext, WorkingSet};
pub use coordinator::{Coordinator, Phase};
pub use feed::ListingFeed;
