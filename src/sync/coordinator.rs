//! Keeps a session's working set current and announces every change.
//!
//! The coordinator owns the session's view of the directory. It loads it on
//! start, re-fetches on a timer, adopts collections other components publish
//! on the bus and collections other sessions write to shared storage, and
//! routes mutations through the record client so the outcome is cached and
//! published in-session. Every cache write reaches the other sessions on its
//! own.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::context::{Applied, SyncContext};
use crate::cache::{LocalCache, Source, StorageChange};
use crate::error::SyncError;
use crate::event::{ComponentId, SyncEvent, Trigger};
use crate::records::{self, Audience, ListingStatus, NewRecord, Record, RecordPatch, Vote};
use crate::remote::ListFilter;

/// Lifecycle of the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Nothing loaded yet
  Uninitialized,
  /// First fetch in flight
  Loading,
  /// Working set is populated and no fetch is running
  Ready,
  /// Working set is populated and a re-fetch is running
  Refreshing,
}

#[derive(Debug)]
struct PhaseState {
  phase: Phase,
  in_flight: usize,
}

/// Marks a fetch as running for as long as it is alive.
struct InFlight<'a>(&'a Coordinator);

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    let mut state = self.0.phase_state();
    state.in_flight = state.in_flight.saturating_sub(1);
    if state.in_flight == 0 {
      state.phase = Phase::Ready;
    }
  }
}

pub struct Coordinator {
  id: ComponentId,
  ctx: SyncContext,
  phase: Mutex<PhaseState>,
  poll_interval: Duration,
}

impl Coordinator {
  pub fn new(ctx: SyncContext, poll_interval: Duration) -> Self {
    Self {
      id: ctx.component_id(),
      ctx,
      phase: Mutex::new(PhaseState {
        phase: Phase::Uninitialized,
        in_flight: 0,
      }),
      poll_interval,
    }
  }

  pub fn id(&self) -> ComponentId {
    self.id
  }

  pub fn context(&self) -> &SyncContext {
    &self.ctx
  }

  pub fn phase(&self) -> Phase {
    self.phase_state().phase
  }

  fn phase_state(&self) -> MutexGuard<'_, PhaseState> {
    self
      .phase
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn begin_fetch(&self) -> InFlight<'_> {
    let mut state = self.phase_state();
    state.in_flight += 1;
    state.phase = match state.phase {
      Phase::Uninitialized | Phase::Loading => Phase::Loading,
      Phase::Ready | Phase::Refreshing => Phase::Refreshing,
    };
    InFlight(self)
  }

  /// Initial load. Returns the tier the working set came from.
  pub async fn start(&self) -> Source {
    self.refresh(Trigger::Initial).await;
    let source = self.ctx.working_set().source();
    info!(tab = %self.ctx.tab(), source = %source, "directory loaded");
    source
  }

  /// Re-fetch the whole collection. Returns whether the working set changed.
  ///
  /// The ticket is taken before the fetch is issued, so a slow response that
  /// lands after a newer one is discarded.
  pub async fn refresh(&self, trigger: Trigger) -> bool {
    let _in_flight = self.begin_fetch();
    let ticket = self.ctx.next_ticket();
    let fetched = self.ctx.client().list(&ListFilter::admin()).await;
    debug!(
      trigger = trigger.as_str(),
      ticket,
      source = %fetched.source,
      count = fetched.data.len(),
      "fetched records"
    );
    self.offer(ticket, fetched.data, fetched.source, trigger)
  }

  /// Take a collection produced elsewhere as the working set.
  pub fn adopt(&self, records: Vec<Record>, source: Source, trigger: Trigger) -> bool {
    let ticket = self.ctx.next_ticket();
    self.offer(ticket, records::sanitize(records), source, trigger)
  }

  fn offer(&self, ticket: u64, records: Vec<Record>, source: Source, trigger: Trigger) -> bool {
    let applied = self.ctx.working_set().apply(ticket, records, source);
    let records = match applied {
      Applied::Stale => {
        debug!(trigger = trigger.as_str(), ticket, "dropping out-of-date result");
        if source == Source::Remote {
          // The late fetch mirrored its rows into the cache on the way in
          let current = self.ctx.working_set().records();
          self.ctx.cache().write(&current);
        }
        return false;
      }
      Applied::Unchanged => return false,
      Applied::Changed(records) => records,
    };

    match trigger {
      // The publisher already told this session; the write tells the others
      Trigger::Broadcast => self.ctx.cache().write(&records),
      _ => self.publish(Arc::clone(&records), source),
    }
    debug!(trigger = trigger.as_str(), count = records.len(), "working set replaced");
    true
  }

  /// Working set as `audience` should see it.
  pub fn records(&self, audience: Audience) -> Vec<Record> {
    self.ctx.records(audience)
  }

  pub async fn create(&self, new: NewRecord) -> Result<Record, SyncError> {
    let record = self.ctx.client().create(new).await?;
    self.commit_upsert(&record);
    Ok(record)
  }

  pub async fn submit(&self, new: NewRecord) -> Result<Record, SyncError> {
    let record = self.ctx.client().submit(new).await?;
    self.commit_upsert(&record);
    Ok(record)
  }

  pub async fn update(&self, id: &str, patch: RecordPatch) -> Result<Record, SyncError> {
    let record = self.ctx.client().update(id, patch).await?;
    self.commit_upsert(&record);
    Ok(record)
  }

  pub async fn approve(&self, id: &str) -> Result<Record, SyncError> {
    self.update(id, RecordPatch::status(ListingStatus::Approved)).await
  }

  pub async fn reject(&self, id: &str) -> Result<Record, SyncError> {
    self.update(id, RecordPatch::status(ListingStatus::Rejected)).await
  }

  pub async fn set_hidden(&self, id: &str, hidden: bool) -> Result<Record, SyncError> {
    self.update(id, RecordPatch::hidden(hidden)).await
  }

  pub async fn set_featured(&self, id: &str, featured: bool) -> Result<Record, SyncError> {
    self.update(id, RecordPatch::featured(featured)).await
  }

  pub async fn vote(&self, id: &str, vote: Vote) -> Result<Record, SyncError> {
    let record = self.ctx.client().vote(id, vote).await?;
    self.commit_upsert(&record);
    Ok(record)
  }

  pub async fn comment(&self, id: &str, author: &str, body: &str) -> Result<Record, SyncError> {
    let record = self.ctx.client().comment(id, author, body).await?;
    self.commit_upsert(&record);
    Ok(record)
  }

  pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
    self.ctx.client().remove(id).await?;
    self.commit(|set| set.retain(|r| r.id != id));
    Ok(())
  }

  fn commit_upsert(&self, record: &Record) {
    self.commit(|set| records::upsert(set, record.clone()));
  }

  /// Fold a completed mutation into the working set, then cache it and
  /// publish it in-session.
  fn commit(&self, change: impl FnOnce(&mut Vec<Record>)) {
    let ticket = self.ctx.next_ticket();
    let (mut set, source) = {
      let working = self.ctx.working_set();
      if working.applied_ticket() == 0 {
        (self.ctx.cache().read(), Source::Cache)
      } else {
        (working.records().to_vec(), working.source())
      }
    };
    change(&mut set);
    records::order_for_display(&mut set);

    let records = {
      let mut working = self.ctx.working_set();
      match working.apply(ticket, set, source) {
        Applied::Changed(records) => records,
        Applied::Unchanged | Applied::Stale => working.records(),
      }
    };

    self.ctx.cache().write(&records);
    self.publish(Arc::clone(&records), source);
    debug!(trigger = Trigger::Mutation.as_str(), count = records.len(), "mutation committed");
  }

  fn publish(&self, records: Arc<[Record]>, source: Source) {
    self.ctx.bus().publish(SyncEvent::RecordsUpdated {
      sender: self.id,
      records,
      source,
    });
  }

  /// React to another session writing shared storage. Returns whether the
  /// working set changed.
  pub fn handle_storage_change(&self, change: StorageChange) -> bool {
    if change.tab == self.ctx.tab() || change.key != self.ctx.cache().key() {
      return false;
    }

    let records = match change.new_value.as_deref() {
      Some(raw) => LocalCache::parse(raw),
      None => self.ctx.cache().load().data,
    };
    debug!(from = %change.tab, count = records.len(), "adopting collection from another session");
    self.adopt(records, Source::Cache, Trigger::StorageChange)
  }

  fn handle_event(&self, event: SyncEvent) {
    match event {
      SyncEvent::RecordsUpdated { sender, .. } if sender == self.id => {}
      SyncEvent::RecordsUpdated {
        records, source, ..
      } => {
        self.adopt(records.to_vec(), source, Trigger::Broadcast);
      }
    }
  }

  /// Drive the coordinator until the session's channels close.
  pub async fn run(self: Arc<Self>) {
    let events = self.ctx.bus().subscribe();
    let changes = self.ctx.origin().subscribe();
    self.run_with(events, changes).await;
  }

  /// Run on a background task. Subscriptions are taken before returning,
  /// so nothing published after this call is missed.
  pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
    let events = self.ctx.bus().subscribe();
    let changes = self.ctx.origin().subscribe();
    tokio::spawn(async move { self.run_with(events, changes).await })
  }

  async fn run_with(
    &self,
    mut events: Receiver<SyncEvent>,
    mut changes: Receiver<StorageChange>,
  ) {
    if self.phase() == Phase::Uninitialized {
      self.start().await;
    }

    let mut ticker = interval(self.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
      tokio::select! {
        _ = ticker.tick() => {
          self.refresh(Trigger::Tick).await;
        }
        event = events.recv() => match event {
          Ok(event) => self.handle_event(event),
          Err(RecvError::Lagged(missed)) => {
            warn!(missed, "event bus lagged, re-fetching");
            self.refresh(Trigger::Resync).await;
          }
          Err(RecvError::Closed) => break,
        },
        change = changes.recv() => match change {
          Ok(change) => {
            self.handle_storage_change(change);
          }
          Err(RecvError::Lagged(missed)) => {
            warn!(missed, "storage notifications lagged, re-reading cache");
            let cached = self.ctx.cache().load();
            self.adopt(cached.data, cached.source, Trigger::StorageChange);
          }
          Err(RecvError::Closed) => break,
        },
      }
    }
    debug!(tab = %self.ctx.tab(), "coordinator stopped");
  }
}
