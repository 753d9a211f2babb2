//! The per-party pipeline orchestrator.
//!
//! Wires the causal merge iterator to the trust processor (credential
//! entries) and to an external mutation sink (data entries), maintains the
//! delivery clock, stamps outbound writes, and exposes the open/close
//! lifecycle plus timeframe barriers and snapshot/restore.

use crate::clock::TimeframeClock;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, SinkError};
use crate::iterator::{FeedSetHandle, FeedSetIterator, StallDiagnostics};
use crate::selector::TrustAwareSelector;
use async_trait::async_trait;
use echo_feeds::{Feed, PartyFeedProvider};
use halo_trust::{PartyProcessor, ProcessorSnapshot, TrustEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{
    FeedKey, FeedMessage, FeedPayload, IdentityKey, PartyKey, SignedCredential, Timeframe,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// An ordered, attributed data mutation as delivered to the sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub feed_key: FeedKey,
    pub seq: u64,
    /// The admitted member owning the feed this mutation came from.
    pub member: IdentityKey,
    /// The timeframe the writer declared at write time.
    pub timeframe: Timeframe,
    pub payload: Vec<u8>,
}

/// The external consumer of ordered mutations.
///
/// Called from the single consumption task, one mutation at a time, in
/// delivery order. An error halts this party's pipeline.
#[async_trait]
pub trait MutationSink: Send + Sync {
    async fn apply_mutation(&self, mutation: MutationRecord) -> Result<(), SinkError>;
}

/// Notifications emitted by a running pipeline.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    /// The committed timeframe advanced.
    TimeframeUpdated(Timeframe),
    /// The iterator has no eligible entry past the stall threshold.
    Stalled(StallDiagnostics),
    MemberAdmitted {
        identity: IdentityKey,
        display_name: Option<String>,
    },
    FeedAdmitted {
        feed_key: FeedKey,
        owner: IdentityKey,
    },
    MemberInfoUpdated {
        identity: IdentityKey,
        display_name: String,
    },
    /// The consumption loop hit a fatal error and halted.
    Error(String),
}

/// Everything a pipeline needs to resume after a restart: the trust replay
/// log, the consumption cursor, and an opaque blob for the external data
/// layer's own state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySnapshot {
    pub party_key: PartyKey,
    pub timeframe: Timeframe,
    pub trust: ProcessorSnapshot,
    pub data: Option<Vec<u8>>,
}

struct Running {
    iterator: FeedSetHandle,
    consume_task: JoinHandle<()>,
    forwarders: Vec<JoinHandle<()>>,
}

pub struct Pipeline {
    party_key: PartyKey,
    config: PipelineConfig,
    clock: TimeframeClock,
    processor: Arc<Mutex<PartyProcessor>>,
    provider: Arc<PartyFeedProvider>,
    sink: Arc<dyn MutationSink>,
    genesis_found: Arc<AtomicBool>,
    events_tx: broadcast::Sender<PipelineEvent>,
    write_feed: Mutex<Option<Arc<Feed>>>,
    is_open: AtomicBool,
    running: Mutex<Option<Running>>,
}

impl Pipeline {
    pub fn new(
        provider: Arc<PartyFeedProvider>,
        sink: Arc<dyn MutationSink>,
        config: PipelineConfig,
    ) -> Self {
        let party_key = *provider.party_key();
        let (events_tx, _) = broadcast::channel(config.event_capacity);
        Self {
            party_key,
            config,
            clock: TimeframeClock::new(Timeframe::new()),
            processor: Arc::new(Mutex::new(PartyProcessor::new(party_key))),
            provider,
            sink,
            genesis_found: Arc::new(AtomicBool::new(false)),
            events_tx,
            write_feed: Mutex::new(None),
            is_open: AtomicBool::new(false),
            running: Mutex::new(None),
        }
    }

    pub fn party_key(&self) -> &PartyKey {
        &self.party_key
    }

    /// The committed timeframe: everything dispatched so far.
    pub fn timeframe(&self) -> Timeframe {
        self.clock.timeframe()
    }

    /// The delivery timeframe: everything yielded by the iterator,
    /// including the entry currently being dispatched.
    pub fn pending_timeframe(&self) -> Timeframe {
        self.clock.pending_timeframe()
    }

    /// The latest theoretical timeframe over all tracked feeds. Consumption
    /// has caught up when the committed timeframe covers this.
    pub fn end_timeframe(&self) -> Timeframe {
        self.provider
            .feeds()
            .into_iter()
            .filter(|feed| feed.len() > 0)
            .map(|feed| (*feed.key(), feed.len() - 1))
            .collect()
    }

    pub fn genesis_found(&self) -> bool {
        self.processor.lock().genesis_found()
    }

    pub fn member_keys(&self) -> Vec<IdentityKey> {
        self.processor.lock().member_keys()
    }

    pub fn feed_keys(&self) -> Vec<FeedKey> {
        self.processor.lock().feed_keys()
    }

    pub fn feed_owner(&self, feed_key: &FeedKey) -> Option<IdentityKey> {
        self.processor.lock().feed_owner(feed_key)
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events_tx.subscribe()
    }

    /// Resolve once the committed timeframe covers `target`.
    pub async fn wait_until_reached(&self, target: &Timeframe) {
        self.clock.wait_until_reached(target).await;
    }

    /// Start consumption. Tracks the genesis feed, replays already-tracked
    /// feeds from the current cursor, and spawns the single consumption
    /// task for this party.
    pub async fn open(&self, genesis_feed_key: FeedKey) -> Result<(), PipelineError> {
        if self.is_open.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::AlreadyOpen);
        }
        if let Err(err) = self.open_inner(genesis_feed_key).await {
            self.is_open.store(false, Ordering::Release);
            return Err(err);
        }
        Ok(())
    }

    async fn open_inner(&self, genesis_feed_key: FeedKey) -> Result<(), PipelineError> {
        self.provider.save_genesis_feed(genesis_feed_key).await?;
        // After a restart the metadata record is the only memory of which
        // remote feeds were admitted; reopen them before consumption starts.
        self.provider.open_recorded_feeds().await?;
        self.provider
            .create_or_open_readonly_feed(genesis_feed_key)
            .await?;

        self.genesis_found
            .store(self.processor.lock().genesis_found(), Ordering::Release);

        let selector = Arc::new(TrustAwareSelector::new(
            self.clock.clone(),
            self.genesis_found.clone(),
        ));
        let (iterator, handle) = FeedSetIterator::new(
            selector,
            self.clock.clone(),
            self.clock.timeframe(),
            Duration::from_millis(self.config.stall_timeout_ms),
        );

        // Subscribe to growth before seeding, so a feed tracked in between
        // is seen on one side or the other; the iterator deduplicates.
        let mut growth = self.provider.subscribe();
        for feed in self.provider.feeds() {
            handle.add_feed(feed);
        }
        let growth_task = tokio::spawn({
            let handle = handle.clone();
            async move {
                loop {
                    match growth.recv().await {
                        Ok(feed) => handle.add_feed(feed),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        let mut stalls = iterator.subscribe_stalled();
        let stall_task = tokio::spawn({
            let events_tx = self.events_tx.clone();
            async move {
                loop {
                    match stalls.recv().await {
                        Ok(diagnostics) => {
                            let _ = events_tx.send(PipelineEvent::Stalled(diagnostics));
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        let consume_task = tokio::spawn(consume_loop(
            iterator,
            self.processor.clone(),
            self.provider.clone(),
            self.sink.clone(),
            self.clock.clone(),
            self.genesis_found.clone(),
            self.events_tx.clone(),
        ));

        info!(party = %self.party_key.short(), genesis_feed = %genesis_feed_key.short(), "pipeline open");
        *self.running.lock() = Some(Running {
            iterator: handle,
            consume_task,
            forwarders: vec![growth_task, stall_task],
        });
        Ok(())
    }

    /// Stop consumption. Idempotent; once this returns, no further sink
    /// calls or events are made.
    pub async fn close(&self) -> Result<(), PipelineError> {
        if !self.is_open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.iterator.close();
            // The consume task exits via the iterator returning None.
            let _ = running.consume_task.await;
            for task in running.forwarders {
                task.abort();
            }
        }
        self.provider
            .save_latest_timeframe(self.clock.timeframe())
            .await?;
        info!(party = %self.party_key.short(), "pipeline closed");
        Ok(())
    }

    /// Designate the local writable feed for outbound writes.
    pub fn set_write_feed(&self, feed: Arc<Feed>) -> Result<(), PipelineError> {
        if !feed.writable() {
            return Err(PipelineError::NotWritable);
        }
        *self.write_feed.lock() = Some(feed);
        Ok(())
    }

    /// Append a data mutation to the local writable feed, stamped with a
    /// snapshot of the committed timeframe. Returns the assigned sequence.
    pub fn write_mutation(&self, data: Vec<u8>) -> Result<u64, PipelineError> {
        let feed = self
            .write_feed
            .lock()
            .clone()
            .ok_or(PipelineError::NotWritable)?;
        let message = FeedMessage::echo(self.clock.timeframe(), data);
        Ok(feed.append(message)?)
    }

    /// Append a credential to the local writable feed.
    pub fn write_credential(&self, credential: SignedCredential) -> Result<u64, PipelineError> {
        let feed = self
            .write_feed
            .lock()
            .clone()
            .ok_or(PipelineError::NotWritable)?;
        Ok(feed.append(FeedMessage::halo(credential))?)
    }

    /// Snapshot the pipeline for restart. `data` is the external data
    /// layer's own serialized state, carried opaquely.
    pub fn create_snapshot(&self, data: Option<Vec<u8>>) -> PartySnapshot {
        PartySnapshot {
            party_key: self.party_key,
            timeframe: self.clock.timeframe(),
            trust: self.processor.lock().make_snapshot(),
            data,
        }
    }

    /// Restore a snapshot into this pipeline. Only valid before `open`;
    /// returns the external data layer's blob for the caller to restore.
    pub fn restore_from_snapshot(
        &self,
        snapshot: PartySnapshot,
    ) -> Result<Option<Vec<u8>>, PipelineError> {
        if self.is_open.load(Ordering::Acquire) {
            return Err(PipelineError::RestoreWhileOpen);
        }
        let mut processor = self.processor.lock();
        processor.restore_from_snapshot(snapshot.trust)?;
        self.genesis_found
            .store(processor.genesis_found(), Ordering::Release);
        drop(processor);
        self.clock.set(snapshot.timeframe);
        Ok(snapshot.data)
    }
}

#[allow(clippy::too_many_arguments)]
async fn consume_loop(
    mut iterator: FeedSetIterator,
    processor: Arc<Mutex<PartyProcessor>>,
    provider: Arc<PartyFeedProvider>,
    sink: Arc<dyn MutationSink>,
    clock: TimeframeClock,
    genesis_found: Arc<AtomicBool>,
    events_tx: broadcast::Sender<PipelineEvent>,
) {
    while let Some(block) = iterator.next().await {
        match block.message.payload {
            FeedPayload::Halo(signed) => {
                let applied = processor
                    .lock()
                    .process_message(block.feed_key, block.seq, &signed);
                // Rejections are logged by the processor; the delivery
                // clock still advances below.
                if let Ok(events) = applied {
                    if processor.lock().genesis_found() {
                        genesis_found.store(true, Ordering::Release);
                    }
                    for event in events {
                        if let Err(err) =
                            dispatch_trust_event(event, &provider, &events_tx).await
                        {
                            error!(%err, "feed admission failed, halting pipeline");
                            let _ = events_tx.send(PipelineEvent::Error(err.to_string()));
                            return;
                        }
                    }
                }
            }
            FeedPayload::Echo(echo) => {
                // Resolve before dispatch; the lock must not be held across
                // the sink await.
                let owner = processor.lock().feed_owner(&block.feed_key);
                match owner {
                    None => {
                        // Consumed but unattributable. The clock still
                        // advances; dependants are not blocked.
                        error!(
                            feed = %block.feed_key.short(),
                            seq = block.seq,
                            "mutation from unattributed feed dropped"
                        );
                    }
                    Some(member) => {
                        let record = MutationRecord {
                            feed_key: block.feed_key,
                            seq: block.seq,
                            member,
                            timeframe: echo.timeframe,
                            payload: echo.data,
                        };
                        if let Err(err) = sink.apply_mutation(record).await {
                            error!(%err, "mutation sink failed, halting pipeline");
                            let _ = events_tx.send(PipelineEvent::Error(err.to_string()));
                            return;
                        }
                    }
                }
            }
        }
        let committed = clock.commit();
        let _ = events_tx.send(PipelineEvent::TimeframeUpdated(committed));
    }
}

async fn dispatch_trust_event(
    event: TrustEvent,
    provider: &Arc<PartyFeedProvider>,
    events_tx: &broadcast::Sender<PipelineEvent>,
) -> Result<(), PipelineError> {
    match event {
        TrustEvent::FeedAdmitted { feed_key, owner } => {
            if !provider.is_tracked(&feed_key) {
                provider.create_or_open_readonly_feed(feed_key).await?;
            }
            let _ = events_tx.send(PipelineEvent::FeedAdmitted { feed_key, owner });
        }
        TrustEvent::MemberAdmitted {
            identity,
            display_name,
        } => {
            let _ = events_tx.send(PipelineEvent::MemberAdmitted {
                identity,
                display_name,
            });
        }
        TrustEvent::MemberInfoUpdated {
            identity,
            display_name,
        } => {
            let _ = events_tx.send(PipelineEvent::MemberInfoUpdated {
                identity,
                display_name,
            });
        }
    }
    Ok(())
}
