//! The causal merge iterator.
//!
//! Pulls entries off a growing set of feeds and yields them one at a time in
//! an order chosen by the [`MessageSelector`]. The feed set grows live
//! through a [`FeedSetHandle`] without restarting the iterator or losing
//! position in already-tracked feeds. When no candidate is eligible the
//! iterator parks until a tracked feed gains an entry or a feed is added; a
//! stall outlasting the configured threshold emits a diagnostic naming the
//! blocked candidates.

use crate::clock::TimeframeClock;
use crate::selector::{Candidate, MessageSelector};
use echo_feeds::Feed;
use shared_types::{FeedKey, FeedMessageBlock, Timeframe};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{StreamExt, StreamMap};
use tracing::{debug, warn};

const STALL_CHANNEL_CAPACITY: usize = 16;

/// Emitted when the iterator has been stalled past the threshold: the head
/// entry of every tracked feed that has one, none of them eligible.
#[derive(Clone, Debug)]
pub struct StallDiagnostics {
    pub candidates: Vec<(FeedKey, u64)>,
}

/// Clonable control surface for a running [`FeedSetIterator`].
#[derive(Clone)]
pub struct FeedSetHandle {
    feed_tx: mpsc::UnboundedSender<Arc<Feed>>,
    close_tx: Arc<watch::Sender<bool>>,
}

impl FeedSetHandle {
    /// Add a feed to the tracked set. Takes effect before the next yield.
    pub fn add_feed(&self, feed: Arc<Feed>) {
        // The iterator only drops its receiver on close; additions after
        // close are intentionally ignored.
        let _ = self.feed_tx.send(feed);
    }

    /// Ask the iterator to finish. The next `next()` call returns `None`.
    pub fn close(&self) {
        self.close_tx.send_replace(true);
    }
}

struct TrackedFeed {
    feed: Arc<Feed>,
    /// Next sequence number to offer for selection.
    cursor: u64,
}

pub struct FeedSetIterator {
    selector: Arc<dyn MessageSelector>,
    clock: TimeframeClock,
    /// Start position: feeds named here resume after their recorded
    /// sequence; unknown feeds start from 0.
    start: Timeframe,
    /// Registration order. The selector sees candidates in this order.
    feeds: Vec<TrackedFeed>,
    known: HashSet<FeedKey>,
    /// Wakes the loop when any tracked feed grows.
    appends: StreamMap<FeedKey, WatchStream<u64>>,
    feed_rx: mpsc::UnboundedReceiver<Arc<Feed>>,
    close_rx: watch::Receiver<bool>,
    stall_timeout: Duration,
    stalled_tx: broadcast::Sender<StallDiagnostics>,
}

impl FeedSetIterator {
    pub fn new(
        selector: Arc<dyn MessageSelector>,
        clock: TimeframeClock,
        start: Timeframe,
        stall_timeout: Duration,
    ) -> (Self, FeedSetHandle) {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = watch::channel(false);
        let (stalled_tx, _) = broadcast::channel(STALL_CHANNEL_CAPACITY);
        let iterator = Self {
            selector,
            clock,
            start,
            feeds: Vec::new(),
            known: HashSet::new(),
            appends: StreamMap::new(),
            feed_rx,
            close_rx,
            stall_timeout,
            stalled_tx,
        };
        let handle = FeedSetHandle {
            feed_tx,
            close_tx: Arc::new(close_tx),
        };
        (iterator, handle)
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Subscribe to stall diagnostics.
    pub fn subscribe_stalled(&self) -> broadcast::Receiver<StallDiagnostics> {
        self.stalled_tx.subscribe()
    }

    /// Yield the next entry in causal order, or `None` once closed.
    ///
    /// Cancel-safe: no entry is consumed unless it is returned.
    pub async fn next(&mut self) -> Option<FeedMessageBlock> {
        let mut stall_reported = false;

        loop {
            if *self.close_rx.borrow() {
                return None;
            }
            self.drain_added_feeds();

            if let Some(block) = self.try_select() {
                return Some(block);
            }

            tokio::select! {
                _ = self.close_rx.changed() => {}
                added = self.feed_rx.recv() => {
                    if let Some(feed) = added {
                        self.register(feed);
                    }
                }
                // Yields None while no feeds are tracked, which disables
                // this branch for the rest of the wait.
                Some(_) = self.appends.next() => {}
                _ = tokio::time::sleep(self.stall_timeout), if !stall_reported => {
                    stall_reported = true;
                    self.report_stall();
                }
            }
        }
    }

    /// Scan head candidates in registration order and consume the selected
    /// one: advance its cursor and merge its position into the pending
    /// clock.
    fn try_select(&mut self) -> Option<FeedMessageBlock> {
        let candidates = self.candidates();
        let index = self.selector.select(&candidates)?;
        let chosen = &candidates[index];

        for tracked in &mut self.feeds {
            if tracked.feed.key() == &chosen.feed_key {
                tracked.cursor = chosen.seq + 1;
                break;
            }
        }
        self.clock.update_pending(chosen.feed_key, chosen.seq);

        Some(FeedMessageBlock {
            feed_key: chosen.feed_key,
            seq: chosen.seq,
            message: chosen.message.clone(),
        })
    }

    fn candidates(&self) -> Vec<Candidate> {
        self.feeds
            .iter()
            .filter_map(|tracked| {
                tracked.feed.get(tracked.cursor).map(|message| Candidate {
                    feed_key: *tracked.feed.key(),
                    seq: tracked.cursor,
                    message,
                })
            })
            .collect()
    }

    fn drain_added_feeds(&mut self) {
        while let Ok(feed) = self.feed_rx.try_recv() {
            self.register(feed);
        }
    }

    fn register(&mut self, feed: Arc<Feed>) {
        let key = *feed.key();
        // The provider broadcasts feeds it tracked before this iterator
        // subscribed as well; additions are deduplicated here rather than
        // treated as an invariant violation.
        if !self.known.insert(key) {
            debug!(feed = %key.short(), "feed already tracked, ignoring");
            return;
        }

        let cursor = match self.start.get(&key) {
            Some(seq) => seq + 1,
            None => 0,
        };
        debug!(feed = %key.short(), cursor, "tracking feed");
        self.appends
            .insert(key, WatchStream::from_changes(feed.on_append()));
        self.feeds.push(TrackedFeed { feed, cursor });
    }

    fn report_stall(&self) {
        let diagnostics = StallDiagnostics {
            candidates: self
                .candidates()
                .iter()
                .map(|c| (c.feed_key, c.seq))
                .collect(),
        };
        warn!(
            candidates = ?diagnostics.candidates,
            timeframe = ?self.clock.pending_timeframe(),
            "iterator stalled, no eligible entry"
        );
        let _ = self.stalled_tx.send(diagnostics);
    }
}
