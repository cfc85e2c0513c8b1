//! Local persistence for offline support.
//!
//! This module provides:
//! - Origin-scoped key-value storage (SQLite or in-memory)
//! - The local record cache stored under a single key
//! - Source tagging so callers can tell which fallback tier served data

mod local;
mod storage;
mod traits;

pub use local::{LocalCache, StorageChange, DEFAULT_KEY};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use traits::{Fetched, Source};
