//! An open handle over one append-only, single-writer log.
//!
//! The byte-level persistence and replication of feeds is an external
//! collaborator; the handle keeps the decoded entries in memory and exposes
//! the interface the pipeline core consumes: append, read-at, and an
//! observable length. Sequence numbers start at 0 and are assigned by the
//! log, never by the caller.

use crate::errors::FeedError;
use parking_lot::RwLock;
use shared_types::{FeedKey, FeedMessage};
use tokio::sync::watch;

pub struct Feed {
    key: FeedKey,
    writable: bool,
    entries: RwLock<Vec<FeedMessage>>,
    length_tx: watch::Sender<u64>,
}

impl Feed {
    pub(crate) fn new(key: FeedKey, writable: bool) -> Self {
        let (length_tx, _) = watch::channel(0);
        Self {
            key,
            writable,
            entries: RwLock::new(Vec::new()),
            length_tx,
        }
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn len(&self) -> u64 {
        self.entries.read().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Append a message and return its assigned sequence number.
    pub fn append(&self, message: FeedMessage) -> Result<u64, FeedError> {
        if !self.writable {
            return Err(FeedError::ReadOnly(self.key.short()));
        }
        let seq = self.append_unchecked(message);
        Ok(seq)
    }

    /// Append without the writable check: the ingest path for entries
    /// arriving from replication, which lands remote entries into handles
    /// that are read-only for the local writer.
    pub fn replicate(&self, message: FeedMessage) -> u64 {
        self.append_unchecked(message)
    }

    fn append_unchecked(&self, message: FeedMessage) -> u64 {
        let mut entries = self.entries.write();
        entries.push(message);
        let len = entries.len() as u64;
        drop(entries);
        // Receivers only care about the latest length.
        self.length_tx.send_replace(len);
        len - 1
    }

    /// Read the entry at `seq`, or `None` while it is still pending.
    pub fn get(&self, seq: u64) -> Option<FeedMessage> {
        self.entries.read().get(seq as usize).cloned()
    }

    /// Watch the feed length; changes whenever an entry is appended.
    pub fn on_append(&self) -> watch::Receiver<u64> {
        self.length_tx.subscribe()
    }
}
