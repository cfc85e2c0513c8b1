use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::debug;

use super::context::SyncContext;
use crate::cache::Source;
use crate::event::SyncEvent;
use crate::records::Record;
use crate::remote::ListFilter;

/// A rendered listing that follows the session's bus.
///
/// Each update is rendered straight from the published collection; the feed
/// never fetches on its own.
pub struct ListingFeed {
  ctx: SyncContext,
  filter: ListFilter,
  events: Receiver<SyncEvent>,
  rendered: Vec<Record>,
  source: Source,
  renders: u64,
}

impl ListingFeed {
  pub fn new(ctx: &SyncContext, filter: ListFilter) -> Self {
    let events = ctx.bus().subscribe();
    let (records, source) = ctx.snapshot();
    let mut feed = Self {
      ctx: ctx.clone(),
      filter,
      events,
      rendered: Vec::new(),
      source,
      renders: 0,
    };
    feed.render(&records, source);
    feed
  }

  pub fn rendered(&self) -> &[Record] {
    &self.rendered
  }

  pub fn source(&self) -> Source {
    self.source
  }

  /// Number of times the listing was rendered, including the first.
  pub fn renders(&self) -> u64 {
    self.renders
  }

  fn render(&mut self, records: &Arc<[Record]>, source: Source) {
    self.rendered = self.filter.apply(records.to_vec());
    self.source = source;
    self.renders += 1;
  }

  /// Re-render from the session's working set, for when updates were missed.
  fn resync(&mut self) {
    let (records, source) = self.ctx.snapshot();
    self.render(&records, source);
  }

  /// Wait for the next update and render it. `None` once the bus is gone.
  pub async fn next_render(&mut self) -> Option<&[Record]> {
    match self.events.recv().await {
      Ok(SyncEvent::RecordsUpdated {
        records, source, ..
      }) => self.render(&records, source),
      Err(RecvError::Lagged(missed)) => {
        debug!(missed, "listing feed lagged, rendering working set");
        self.resync();
      }
      Err(RecvError::Closed) => return None,
    }
    Some(&self.rendered)
  }

  /// Render whatever arrived since the last call without waiting. Only the
  /// newest update is rendered. Returns whether anything was rendered.
  pub fn poll(&mut self) -> bool {
    let mut latest = None;
    loop {
      match self.events.try_recv() {
        Ok(SyncEvent::RecordsUpdated {
          records, source, ..
        }) => latest = Some((records, source)),
        Err(TryRecvError::Lagged(_)) => {
          self.resync();
          return true;
        }
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
      }
    }

    match latest {
      Some((records, source)) => {
        self.render(&records, source);
        true
      }
      None => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{MemoryStore, DEFAULT_KEY};
  use crate::event::ComponentId;
  use crate::records::{Audience, RecordKind};
  use crate::sync::{Coordinator, Origin};
  use std::time::Duration;

  fn context() -> SyncContext {
    SyncContext::new(Origin::new(Arc::new(MemoryStore::new())), None, DEFAULT_KEY)
  }

  fn publish(ctx: &SyncContext, records: Vec<Record>) {
    ctx.bus().publish(SyncEvent::RecordsUpdated {
      sender: ComponentId(99),
      records: Arc::from(records),
      source: Source::Remote,
    });
  }

  #[tokio::test]
  async fn test_renders_from_payload() {
    let ctx = context();
    let mut feed = ListingFeed::new(&ctx, ListFilter::default());
    assert!(feed.rendered().is_empty());

    let mut hidden = Record::new("2", "Ghost", RecordKind::Recruiter);
    hidden.hidden = true;
    publish(&ctx, vec![Record::new("1", "Jane Doe", RecordKind::Recruiter), hidden]);

    let rendered = feed.next_render().await.unwrap();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].id, "1");
    assert_eq!(feed.source(), Source::Remote);
    assert_eq!(feed.renders(), 2);
  }

  #[tokio::test]
  async fn test_feed_follows_coordinator_mutations() {
    let ctx = context();
    let coordinator = Coordinator::new(ctx.clone(), Duration::from_secs(30));
    coordinator.start().await;
    let mut feed = ListingFeed::new(&ctx, ListFilter::admin());
    assert_eq!(feed.rendered().len(), 5);

    coordinator.set_hidden("seed-3", true).await.unwrap();

    assert!(feed.poll());
    let hidden = feed.rendered().iter().find(|r| r.id == "seed-3").unwrap();
    assert!(hidden.hidden);
    assert!(!ctx.records(Audience::Public).iter().any(|r| r.id == "seed-3"));
  }

  #[test]
  fn test_poll_renders_only_latest() {
    let ctx = context();
    let mut feed = ListingFeed::new(&ctx, ListFilter::default());

    publish(&ctx, vec![Record::new("1", "Jane Doe", RecordKind::Recruiter)]);
    publish(
      &ctx,
      vec![
        Record::new("1", "Jane Doe", RecordKind::Recruiter),
        Record::new("2", "HireFlow AI", RecordKind::Tool),
      ],
    );

    assert!(feed.poll());
    assert_eq!(feed.rendered().len(), 2);
    assert_eq!(feed.renders(), 2);
    assert!(!feed.poll());
  }
}
