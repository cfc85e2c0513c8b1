//! Access to the remote record collection, with fallback to the local cache.

mod client;
mod http;
#[cfg(test)]
pub(crate) mod memory;
mod store;

pub use client::RecordClient;
pub use http::HttpRemoteStore;
pub use store::{ListFilter, RemoteError, RemoteStore};
