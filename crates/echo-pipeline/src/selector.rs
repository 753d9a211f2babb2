//! Message selection policy.
//!
//! Given the head entry of every tracked feed, the selector decides which
//! one (if any) is eligible for delivery next. The policy encodes two
//! orderings at once: trust bootstrap (nothing before the party genesis) and
//! causal completeness (a data entry waits for its declared dependencies).

use crate::clock::TimeframeClock;
use shared_types::{FeedKey, FeedMessage, FeedPayload, Timeframe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The head entry of one tracked feed, offered for selection.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub feed_key: FeedKey,
    pub seq: u64,
    pub message: FeedMessage,
}

/// Picks the next candidate to deliver, or `None` to stall.
///
/// Candidates arrive in feed registration order; returning the first
/// eligible index makes ties deterministic.
pub trait MessageSelector: Send + Sync {
    fn select(&self, candidates: &[Candidate]) -> Option<usize>;
}

/// The production policy.
///
/// Data entries are preferred over credentials so that the delivery clock
/// advances as eagerly as causality allows. A data entry is eligible when
/// its declared timeframe has no gaps against the pending clock. Credentials
/// carry no declared timeframe and are always eligible, except that before
/// the party genesis has been processed only the genesis credential itself
/// may pass.
pub struct TrustAwareSelector {
    clock: TimeframeClock,
    genesis_found: Arc<AtomicBool>,
}

impl TrustAwareSelector {
    pub fn new(clock: TimeframeClock, genesis_found: Arc<AtomicBool>) -> Self {
        Self {
            clock,
            genesis_found,
        }
    }
}

impl MessageSelector for TrustAwareSelector {
    fn select(&self, candidates: &[Candidate]) -> Option<usize> {
        let local = self.clock.pending_timeframe();

        for (index, candidate) in candidates.iter().enumerate() {
            if let Some(declared) = candidate.message.declared_timeframe() {
                if !Timeframe::has_gaps(declared, &local) {
                    return Some(index);
                }
            }
        }

        let genesis_found = self.genesis_found.load(Ordering::Acquire);
        for (index, candidate) in candidates.iter().enumerate() {
            if let FeedPayload::Halo(signed) = &candidate.message.payload {
                if genesis_found || signed.credential.is_genesis() {
                    return Some(index);
                }
            }
        }

        None
    }
}
