//! Per-party feed provisioning.
//!
//! The provider owns the ordered set of feeds tracked for one party. It
//! creates or reopens the local writable feed, lazily opens remote feeds as
//! their admissions are processed, and announces feed-set growth to the
//! merge iterator. Registration order is stable; the iterator uses it as a
//! deterministic tie-break.

use crate::errors::ProviderError;
use crate::feed::Feed;
use crate::metadata::MetadataStore;
use crate::store::FeedStore;
use parking_lot::RwLock;
use shared_crypto::Keyring;
use shared_types::{FeedKey, PartyKey, Timeframe};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

const FEED_OPENED_CAPACITY: usize = 64;

pub struct PartyFeedProvider {
    party_key: PartyKey,
    metadata: Arc<MetadataStore>,
    keyring: Arc<Keyring>,
    feed_store: Arc<FeedStore>,
    /// Tracked feeds in registration order.
    tracked: RwLock<Vec<Arc<Feed>>>,
    /// Serializes create-or-open calls for this party.
    open_lock: Mutex<()>,
    feed_opened_tx: broadcast::Sender<Arc<Feed>>,
}

impl PartyFeedProvider {
    pub fn new(
        party_key: PartyKey,
        metadata: Arc<MetadataStore>,
        keyring: Arc<Keyring>,
        feed_store: Arc<FeedStore>,
    ) -> Self {
        let (feed_opened_tx, _) = broadcast::channel(FEED_OPENED_CAPACITY);
        Self {
            party_key,
            metadata,
            keyring,
            feed_store,
            tracked: RwLock::new(Vec::new()),
            open_lock: Mutex::new(()),
            feed_opened_tx,
        }
    }

    pub fn party_key(&self) -> &PartyKey {
        &self.party_key
    }

    /// Tracked feeds in registration order.
    pub fn feeds(&self) -> Vec<Arc<Feed>> {
        self.tracked.read().clone()
    }

    pub fn is_tracked(&self, feed_key: &FeedKey) -> bool {
        self.tracked.read().iter().any(|f| f.key() == feed_key)
    }

    /// Subscribe to newly tracked feeds.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Feed>> {
        self.feed_opened_tx.subscribe()
    }

    /// Create or reopen the party's local writable feed.
    ///
    /// Idempotent: if a data feed is already recorded for this party and the
    /// keyring still holds its secret, that exact feed is reopened;
    /// otherwise a fresh feed identity is minted and persisted.
    pub async fn create_or_open_writable_feed(&self) -> Result<Arc<Feed>, ProviderError> {
        let _guard = self.open_lock.lock().await;

        let recorded = self
            .metadata
            .party(&self.party_key)
            .and_then(|record| record.data_feed_key)
            .filter(|key| self.keyring.has_secret(key));

        let feed_key = match recorded {
            Some(key) => key,
            None => {
                let key = self.keyring.generate();
                info!(party = %self.party_key.short(), feed = %key.short(), "minted data feed");
                self.metadata.add_party(self.party_key).await?;
                self.metadata.set_data_feed(self.party_key, key).await?;
                key
            }
        };

        self.metadata
            .add_party_feed(self.party_key, feed_key)
            .await?;
        let feed = self.feed_store.open_read_write(feed_key);
        self.track(feed.clone());
        Ok(feed)
    }

    /// Open a remote feed for reading and begin tracking it.
    ///
    /// Idempotent: returns the existing handle when already tracked.
    pub async fn create_or_open_readonly_feed(
        &self,
        feed_key: FeedKey,
    ) -> Result<Arc<Feed>, ProviderError> {
        let _guard = self.open_lock.lock().await;

        if let Some(feed) = self.tracked_feed(&feed_key) {
            return Ok(feed);
        }

        self.metadata
            .add_party_feed(self.party_key, feed_key)
            .await?;
        let feed = self.feed_store.open_read_only(feed_key);
        self.track(feed.clone());
        Ok(feed)
    }

    /// Reopen every feed recorded for this party after a restart, writable
    /// when the keyring still holds the feed's secret.
    pub async fn open_recorded_feeds(&self) -> Result<Vec<Arc<Feed>>, ProviderError> {
        let _guard = self.open_lock.lock().await;

        let Some(record) = self.metadata.party(&self.party_key) else {
            return Ok(Vec::new());
        };
        let mut opened = Vec::with_capacity(record.feed_keys.len());
        for feed_key in record.feed_keys {
            if let Some(feed) = self.tracked_feed(&feed_key) {
                opened.push(feed);
                continue;
            }
            let feed = if self.keyring.has_secret(&feed_key) {
                self.feed_store.open_read_write(feed_key)
            } else {
                self.feed_store.open_read_only(feed_key)
            };
            self.track(feed.clone());
            opened.push(feed);
        }
        Ok(opened)
    }

    /// Record which feed carries the party genesis.
    pub async fn save_genesis_feed(&self, feed_key: FeedKey) -> Result<(), ProviderError> {
        self.metadata.add_party(self.party_key).await?;
        self.metadata
            .set_genesis_feed(self.party_key, feed_key)
            .await?;
        Ok(())
    }

    /// Persist the party's latest consumed timeframe.
    pub async fn save_latest_timeframe(&self, timeframe: Timeframe) -> Result<(), ProviderError> {
        self.metadata.set_timeframe(self.party_key, timeframe).await?;
        Ok(())
    }

    fn tracked_feed(&self, feed_key: &FeedKey) -> Option<Arc<Feed>> {
        self.tracked
            .read()
            .iter()
            .find(|f| f.key() == feed_key)
            .cloned()
    }

    fn track(&self, feed: Arc<Feed>) {
        let mut tracked = self.tracked.write();
        if let Some(existing) = tracked.iter().find(|f| f.key() == feed.key()) {
            // Reopening the same handle is fine; a distinct handle for the
            // same key means caller deduplication broke. Fail fast.
            assert!(
                Arc::ptr_eq(existing, &feed),
                "feed {} tracked twice",
                feed.key().short()
            );
            return;
        }
        tracked.push(feed.clone());
        drop(tracked);

        debug!(party = %self.party_key.short(), feed = %feed.key().short(), "tracking feed");
        let _ = self.feed_opened_tx.send(feed);
    }
}
