//! The keyed collection of open feed handles.
//!
//! Opening the same key twice returns the same handle, so every consumer of
//! a feed observes the same entries and append notifications. Newly opened
//! feeds are announced on a broadcast channel; the merge iterator's feed-set
//! growth path hangs off that announcement.

use crate::feed::Feed;
use parking_lot::RwLock;
use shared_types::FeedKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const FEED_OPENED_CAPACITY: usize = 64;

pub struct FeedStore {
    feeds: RwLock<HashMap<FeedKey, Arc<Feed>>>,
    feed_opened_tx: broadcast::Sender<Arc<Feed>>,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore {
    pub fn new() -> Self {
        let (feed_opened_tx, _) = broadcast::channel(FEED_OPENED_CAPACITY);
        Self {
            feeds: RwLock::new(HashMap::new()),
            feed_opened_tx,
        }
    }

    /// Open a feed for reading. Returns the existing handle if already open.
    pub fn open_read_only(&self, key: FeedKey) -> Arc<Feed> {
        self.open(key, false)
    }

    /// Open the local writable feed. Returns the existing handle if already
    /// open (the handle keeps whatever writability it was opened with).
    pub fn open_read_write(&self, key: FeedKey) -> Arc<Feed> {
        self.open(key, true)
    }

    fn open(&self, key: FeedKey, writable: bool) -> Arc<Feed> {
        let mut feeds = self.feeds.write();
        if let Some(feed) = feeds.get(&key) {
            return feed.clone();
        }
        let feed = Arc::new(Feed::new(key, writable));
        feeds.insert(key, feed.clone());
        drop(feeds);

        debug!(feed = %key.short(), writable, "feed opened");
        let _ = self.feed_opened_tx.send(feed.clone());
        feed
    }

    pub fn feed(&self, key: &FeedKey) -> Option<Arc<Feed>> {
        self.feeds.read().get(key).cloned()
    }

    pub fn is_open(&self, key: &FeedKey) -> bool {
        self.feeds.read().contains_key(key)
    }

    /// Subscribe to newly opened feeds.
    pub fn subscribe_opened(&self) -> broadcast::Receiver<Arc<Feed>> {
        self.feed_opened_tx.subscribe()
    }
}
