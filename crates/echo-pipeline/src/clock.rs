//! The party's local delivery clock.
//!
//! The clock tracks two timeframes. The pending frame advances the moment
//! the iterator yields an entry and is what the selector compares declared
//! dependencies against, so an entry already sitting in the dispatch queue
//! counts as delivered for selection purposes. The committed frame advances
//! only after the entry has been dispatched downstream; barriers such as
//! `wait_until_reached` observe the committed frame and therefore never
//! resolve ahead of the sink.

use parking_lot::RwLock;
use shared_types::{FeedKey, Timeframe};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct TimeframeClock {
    inner: Arc<ClockInner>,
}

struct ClockInner {
    pending: RwLock<Timeframe>,
    committed_tx: watch::Sender<Timeframe>,
}

impl TimeframeClock {
    pub fn new(start: Timeframe) -> Self {
        let (committed_tx, _) = watch::channel(start.clone());
        Self {
            inner: Arc::new(ClockInner {
                pending: RwLock::new(start),
                committed_tx,
            }),
        }
    }

    /// The committed timeframe: everything dispatched so far.
    pub fn timeframe(&self) -> Timeframe {
        self.inner.committed_tx.borrow().clone()
    }

    /// The pending timeframe: everything yielded so far, dispatched or not.
    pub fn pending_timeframe(&self) -> Timeframe {
        self.inner.pending.read().clone()
    }

    /// Record that `(feed_key, seq)` has been yielded for dispatch.
    pub fn update_pending(&self, feed_key: FeedKey, seq: u64) {
        let mut pending = self.inner.pending.write();
        *pending = pending.with_frame(feed_key, seq);
    }

    /// Publish the pending frame as committed. Returns the new committed
    /// timeframe.
    pub fn commit(&self) -> Timeframe {
        let committed = self.inner.pending.read().clone();
        self.inner.committed_tx.send_replace(committed.clone());
        committed
    }

    /// Reset both frames, for restoring a snapshot cursor before the
    /// pipeline starts.
    pub fn set(&self, timeframe: Timeframe) {
        *self.inner.pending.write() = timeframe.clone();
        self.inner.committed_tx.send_replace(timeframe);
    }

    /// Watch committed-timeframe updates.
    pub fn subscribe(&self) -> watch::Receiver<Timeframe> {
        self.inner.committed_tx.subscribe()
    }

    /// Resolve once the committed timeframe covers every position in
    /// `target`. Resolves immediately if it already does.
    pub async fn wait_until_reached(&self, target: &Timeframe) {
        let mut rx = self.inner.committed_tx.subscribe();
        // The sender lives inside our own Arc, so the channel cannot close
        // while we hold `self`.
        let _ = rx
            .wait_for(|committed| !Timeframe::has_gaps(target, committed))
            .await;
    }
}
