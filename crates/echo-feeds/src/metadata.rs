//! Durable per-party feed bookkeeping.
//!
//! One file holds the whole record set: a 4-byte little-endian length prefix
//! followed by the bincode-encoded payload. The file is re-serialized and
//! overwritten on every save. It is a cache, not a source of truth: any
//! truncation, corruption, or version mismatch on load falls back to an
//! empty store, and the records are re-derived by re-scanning feeds.

use crate::errors::MetadataError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{FeedKey, PartyKey, Timeframe};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Gates forward migrations of the on-disk layout.
pub const STORAGE_VERSION: u32 = 1;

/// Cached bookkeeping for one party.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyFeedRecord {
    pub party_key: PartyKey,
    /// Every feed known for this party, in admission order.
    pub feed_keys: Vec<FeedKey>,
    pub genesis_feed_key: Option<FeedKey>,
    /// The local writable feed.
    pub data_feed_key: Option<FeedKey>,
    /// Last timeframe the pipeline reported having processed.
    pub latest_timeframe: Timeframe,
}

impl PartyFeedRecord {
    fn new(party_key: PartyKey) -> Self {
        Self {
            party_key,
            feed_keys: Vec::new(),
            genesis_feed_key: None,
            data_feed_key: None,
            latest_timeframe: Timeframe::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MetadataRecordSet {
    version: u32,
    parties: Vec<PartyFeedRecord>,
    created: u64,
    updated: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Default for MetadataRecordSet {
    fn default() -> Self {
        let now = unix_now();
        Self {
            version: STORAGE_VERSION,
            parties: Vec::new(),
            created: now,
            updated: now,
        }
    }
}

pub struct MetadataStore {
    path: PathBuf,
    state: RwLock<MetadataRecordSet>,
    /// The save path rewrites the whole file; one writer at a time.
    save_lock: Mutex<()>,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(MetadataRecordSet::default()),
            save_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load records from the backing file. Corrupt or missing data is never
    /// fatal; the store just starts empty.
    pub async fn load(&self) -> Result<(), MetadataError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no metadata file, starting empty");
                return Ok(());
            }
            Err(err) => return Err(MetadataError::Io(err)),
        };

        if let Some(record_set) = decode_record_set(&bytes) {
            debug!(parties = record_set.parties.len(), "metadata loaded");
            *self.state.write() = record_set;
        } else {
            warn!(path = %self.path.display(), "metadata corrupt or stale, starting empty");
            *self.state.write() = MetadataRecordSet::default();
        }
        Ok(())
    }

    async fn save(&self) -> Result<(), MetadataError> {
        let _guard = self.save_lock.lock().await;

        let encoded = {
            let mut state = self.state.write();
            state.updated = unix_now();
            bincode::serialize(&*state).map_err(|err| MetadataError::Encode(err.to_string()))?
        };

        let mut bytes = Vec::with_capacity(4 + encoded.len());
        bytes.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&encoded);

        tokio::fs::write(&self.path, bytes).await?;
        debug!(size = encoded.len(), "metadata saved");
        Ok(())
    }

    pub fn party(&self, party_key: &PartyKey) -> Option<PartyFeedRecord> {
        self.state
            .read()
            .parties
            .iter()
            .find(|record| record.party_key == *party_key)
            .cloned()
    }

    pub fn parties(&self) -> Vec<PartyFeedRecord> {
        self.state.read().parties.clone()
    }

    /// Idempotent upsert of an (initially empty) party record.
    pub async fn add_party(&self, party_key: PartyKey) -> Result<(), MetadataError> {
        let changed = {
            let mut state = self.state.write();
            if state.parties.iter().any(|r| r.party_key == party_key) {
                false
            } else {
                state.parties.push(PartyFeedRecord::new(party_key));
                true
            }
        };
        if changed {
            self.save().await?;
        }
        Ok(())
    }

    /// Record a feed for a party. Creates the party record if needed.
    pub async fn add_party_feed(
        &self,
        party_key: PartyKey,
        feed_key: FeedKey,
    ) -> Result<(), MetadataError> {
        self.update_party(party_key, |record| {
            if record.feed_keys.contains(&feed_key) {
                false
            } else {
                record.feed_keys.push(feed_key);
                true
            }
        })
        .await
    }

    pub async fn set_genesis_feed(
        &self,
        party_key: PartyKey,
        feed_key: FeedKey,
    ) -> Result<(), MetadataError> {
        self.update_party(party_key, |record| {
            if record.genesis_feed_key == Some(feed_key) {
                false
            } else {
                record.genesis_feed_key = Some(feed_key);
                true
            }
        })
        .await
    }

    pub async fn set_data_feed(
        &self,
        party_key: PartyKey,
        feed_key: FeedKey,
    ) -> Result<(), MetadataError> {
        self.update_party(party_key, |record| {
            if record.data_feed_key == Some(feed_key) {
                false
            } else {
                record.data_feed_key = Some(feed_key);
                true
            }
        })
        .await
    }

    pub async fn set_timeframe(
        &self,
        party_key: PartyKey,
        timeframe: Timeframe,
    ) -> Result<(), MetadataError> {
        self.update_party(party_key, |record| {
            if record.latest_timeframe == timeframe {
                false
            } else {
                record.latest_timeframe = timeframe.clone();
                true
            }
        })
        .await
    }

    async fn update_party(
        &self,
        party_key: PartyKey,
        update: impl FnOnce(&mut PartyFeedRecord) -> bool,
    ) -> Result<(), MetadataError> {
        let changed = {
            let mut state = self.state.write();
            let idx = match state.parties.iter().position(|r| r.party_key == party_key) {
                Some(idx) => idx,
                None => {
                    state.parties.push(PartyFeedRecord::new(party_key));
                    state.parties.len() - 1
                }
            };
            update(&mut state.parties[idx])
        };
        if changed {
            self.save().await?;
        }
        Ok(())
    }

    /// Drop all records and delete the backing file.
    pub async fn clear(&self) -> Result<(), MetadataError> {
        *self.state.write() = MetadataRecordSet::default();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MetadataError::Io(err)),
        }
    }
}

fn decode_record_set(bytes: &[u8]) -> Option<MetadataRecordSet> {
    if bytes.len() < 4 {
        return None;
    }
    let declared = u32::from_le_bytes(bytes[..4].try_into().ok()?) as usize;
    let payload = &bytes[4..];
    if payload.len() != declared {
        // Truncated or over-long write.
        return None;
    }
    let record_set: MetadataRecordSet = bincode::deserialize(payload).ok()?;
    if record_set.version != STORAGE_VERSION {
        return None;
    }
    Some(record_set)
}
