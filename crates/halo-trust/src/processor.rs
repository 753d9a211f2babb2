//! The party processor: drives trust state from the credential stream.
//!
//! The processor wraps the pure reducer with the pieces the pipeline needs:
//! an ordered replay log for snapshotting, and a broadcast channel carrying
//! admission events to the feed provider and other subscribers.

use crate::errors::{RejectReason, TrustError};
use crate::events::TrustEvent;
use crate::state::PartyTrustState;
use serde::{Deserialize, Serialize};
use shared_types::{FeedKey, IdentityKey, PartyKey, SignedCredential};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Events to buffer per subscriber before lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The ordered list of processed credential messages. Replaying it through
/// the identical acceptance algorithm reproduces the trust state exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSnapshot {
    pub party_key: PartyKey,
    pub messages: Vec<(FeedKey, SignedCredential)>,
}

/// Stateful credential processor for one party.
pub struct PartyProcessor {
    state: PartyTrustState,
    replay_log: Vec<(FeedKey, SignedCredential)>,
    events_tx: broadcast::Sender<TrustEvent>,
}

impl PartyProcessor {
    pub fn new(party_key: PartyKey) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: PartyTrustState::new(party_key),
            replay_log: Vec::new(),
            events_tx,
        }
    }

    pub fn party_key(&self) -> &PartyKey {
        self.state.party_key()
    }

    pub fn genesis_found(&self) -> bool {
        self.state.genesis_found()
    }

    pub fn member_keys(&self) -> Vec<IdentityKey> {
        self.state.member_keys()
    }

    pub fn feed_keys(&self) -> Vec<FeedKey> {
        self.state.feed_keys()
    }

    pub fn is_feed_admitted(&self, feed_key: &FeedKey) -> bool {
        self.state.is_feed_admitted(feed_key)
    }

    /// The member owning a feed, once its admission has been processed.
    pub fn feed_owner(&self, feed_key: &FeedKey) -> Option<IdentityKey> {
        self.state.feed_owner(feed_key)
    }

    pub fn state(&self) -> &PartyTrustState {
        &self.state
    }

    /// Subscribe to admission events.
    pub fn subscribe(&self) -> broadcast::Receiver<TrustEvent> {
        self.events_tx.subscribe()
    }

    /// Process one credential message read off a feed.
    ///
    /// The message is recorded in the replay log whether or not it is
    /// accepted; replay rejects it again, so restore stays deterministic.
    /// On acceptance the resulting events are broadcast and returned.
    pub fn process_message(
        &mut self,
        feed_key: FeedKey,
        seq: u64,
        message: &SignedCredential,
    ) -> Result<Vec<TrustEvent>, RejectReason> {
        self.replay_log.push((feed_key, message.clone()));

        match self.state.apply(message) {
            Ok(events) => {
                debug!(
                    feed = %feed_key.short(),
                    seq,
                    events = events.len(),
                    "credential applied"
                );
                for event in &events {
                    // No receivers is fine; events are best-effort fan-out.
                    let _ = self.events_tx.send(event.clone());
                }
                Ok(events)
            }
            Err(reason) => {
                warn!(feed = %feed_key.short(), seq, %reason, "credential rejected");
                Err(reason)
            }
        }
    }

    /// Snapshot the processed message sequence.
    pub fn make_snapshot(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            party_key: *self.state.party_key(),
            messages: self.replay_log.clone(),
        }
    }

    /// Replay a snapshot into this processor.
    ///
    /// Only valid as the very first operation on a fresh instance. Events are
    /// not broadcast during replay; subscribers attach afterwards.
    pub fn restore_from_snapshot(&mut self, snapshot: ProcessorSnapshot) -> Result<(), TrustError> {
        if !self.replay_log.is_empty() || !self.state.is_pristine() {
            return Err(TrustError::NotEmpty);
        }
        if snapshot.party_key != *self.state.party_key() {
            return Err(TrustError::SnapshotPartyMismatch);
        }

        for (feed_key, message) in snapshot.messages {
            // Rejections were already rejected when first processed; the
            // replay log still records them.
            if let Err(reason) = self.state.apply(&message) {
                debug!(feed = %feed_key.short(), %reason, "rejected during replay");
            }
            self.replay_log.push((feed_key, message));
        }

        debug!(
            party = %self.state.party_key().short(),
            messages = self.replay_log.len(),
            "processor restored from snapshot"
        );
        Ok(())
    }
}
