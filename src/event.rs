use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use crate::cache::Source;
use crate::records::Record;

/// Identifies a component publishing on a tab's bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub u64);

/// Identifies a session sharing an origin's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "tab-{}", self.0)
  }
}

/// Same-tab notifications
#[derive(Debug, Clone)]
pub enum SyncEvent {
  /// The record collection changed; consumers re-render from `records`
  RecordsUpdated {
    sender: ComponentId,
    records: Arc<[Record]>,
    source: Source,
  },
}

/// Why the coordinator is refreshing its working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
  /// First load after mount
  Initial,
  /// Periodic re-fetch
  Tick,
  /// User asked for a refresh
  Manual,
  /// Another tab changed the shared storage
  StorageChange,
  /// Another component in this tab published a new collection
  Broadcast,
  /// Notifications were missed; re-fetch and tell everyone
  Resync,
  /// This coordinator completed a mutation
  Mutation,
}

impl Trigger {
  pub fn as_str(&self) -> &'static str {
    match self {
      Trigger::Initial => "initial",
      Trigger::Tick => "tick",
      Trigger::Manual => "manual",
      Trigger::StorageChange => "storage-change",
      Trigger::Broadcast => "broadcast",
      Trigger::Resync => "resync",
      Trigger::Mutation => "mutation",
    }
  }
}

/// Capacity of each subscriber's backlog before it starts lagging.
const BUS_CAPACITY: usize = 64;

/// Process-wide (per tab) publish/subscribe channel.
#[derive(Clone)]
pub struct EventBus {
  tx: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
  fn default() -> Self {
    Self::new()
  }
}

impl EventBus {
  pub fn new() -> Self {
    let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
    Self { tx }
  }

  /// Publish to every current subscriber. Having none is fine.
  pub fn publish(&self, event: SyncEvent) {
    let delivered = self.tx.send(event).unwrap_or(0);
    trace!(delivered, "published sync event");
  }

  pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
    self.tx.subscribe()
  }
}
