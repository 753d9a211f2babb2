//! Timeframe: the vector clock of the ECHO pipeline.
//!
//! A timeframe maps feed keys to the highest consumed sequence number per
//! feed. Every data entry declares the writer's timeframe at write time; the
//! merge iterator compares declared timeframes against its local clock to
//! decide which entries are causally ready.

use crate::keys::FeedKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Immutable mapping from feed key to highest consumed sequence number.
///
/// The empty timeframe is the identity element for [`Timeframe::merge`] and
/// has no dependencies against anything.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe(BTreeMap<FeedKey, u64>);

impl Timeframe {
    /// The empty timeframe.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Highest consumed sequence for a feed, if any entry was consumed.
    pub fn get(&self, feed_key: &FeedKey) -> Option<u64> {
        self.0.get(feed_key).copied()
    }

    /// Returns a copy with `(feed_key, seq)` merged in (pointwise maximum).
    pub fn with_frame(&self, feed_key: FeedKey, seq: u64) -> Self {
        let mut frames = self.0.clone();
        frames
            .entry(feed_key)
            .and_modify(|s| *s = (*s).max(seq))
            .or_insert(seq);
        Self(frames)
    }

    /// Pointwise maximum per key, union of keys.
    ///
    /// Commutative, associative, and idempotent.
    pub fn merge(a: &Timeframe, b: &Timeframe) -> Timeframe {
        let mut frames = a.0.clone();
        for (feed_key, seq) in &b.0 {
            frames
                .entry(*feed_key)
                .and_modify(|s| *s = (*s).max(*seq))
                .or_insert(*seq);
        }
        Timeframe(frames)
    }

    /// Returns a copy merged with `other`.
    pub fn merged(&self, other: &Timeframe) -> Timeframe {
        Timeframe::merge(self, other)
    }

    /// The pairs of `declared` not yet satisfied by `local`.
    ///
    /// A pair `(feed, seq)` is unsatisfied when `local` has consumed nothing
    /// from `feed`, or has consumed less than `seq`.
    pub fn dependencies(declared: &Timeframe, local: &Timeframe) -> Timeframe {
        let frames = declared
            .0
            .iter()
            .filter(|(feed_key, seq)| match local.get(feed_key) {
                Some(local_seq) => **seq > local_seq,
                None => true,
            })
            .map(|(feed_key, seq)| (*feed_key, *seq))
            .collect();
        Timeframe(frames)
    }

    /// True iff `declared` has at least one pair not satisfied by `local`.
    pub fn has_gaps(declared: &Timeframe, local: &Timeframe) -> bool {
        !Timeframe::dependencies(declared, local).is_empty()
    }

    /// Iterate over `(feed_key, seq)` pairs in key order.
    pub fn frames(&self) -> impl Iterator<Item = (&FeedKey, u64)> {
        self.0.iter().map(|(feed_key, seq)| (feed_key, *seq))
    }

    /// Number of feeds with a consumed position.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(FeedKey, u64)> for Timeframe {
    fn from_iter<I: IntoIterator<Item = (FeedKey, u64)>>(iter: I) -> Self {
        let mut frames = BTreeMap::new();
        for (feed_key, seq) in iter {
            frames
                .entry(feed_key)
                .and_modify(|s: &mut u64| *s = (*s).max(seq))
                .or_insert(seq);
        }
        Self(frames)
    }
}

impl fmt::Debug for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (feed_key, seq) in &self.0 {
            map.entry(&feed_key.short(), seq);
        }
        map.finish()
    }
}
