//! Feed wire messages.
//!
//! Every entry appended to a feed is a `FeedMessage` carrying exactly one of
//! two payloads: a `halo` credential (trust) or an `echo` mutation (data).
//! Echo payloads declare the writer's timeframe at write time; this is the
//! causal-dependency metadata the merge iterator consumes.

use crate::credentials::SignedCredential;
use crate::keys::FeedKey;
use crate::timeframe::Timeframe;
use serde::{Deserialize, Serialize};

/// A data mutation, stamped with the writer's local timeframe snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoPayload {
    /// The writer's consumed timeframe when this entry was appended.
    pub timeframe: Timeframe,
    /// Opaque mutation bytes, interpreted by the external data layer.
    pub data: Vec<u8>,
}

/// Exactly one of the two subsystem payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedPayload {
    Halo(SignedCredential),
    Echo(EchoPayload),
}

/// The unit of a feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMessage {
    pub payload: FeedPayload,
}

impl FeedMessage {
    pub fn halo(credential: SignedCredential) -> Self {
        Self {
            payload: FeedPayload::Halo(credential),
        }
    }

    pub fn echo(timeframe: Timeframe, data: Vec<u8>) -> Self {
        Self {
            payload: FeedPayload::Echo(EchoPayload { timeframe, data }),
        }
    }

    /// The timeframe this entry declares as its causal dependencies.
    /// Halo entries declare none; trust ordering is handled separately.
    pub fn declared_timeframe(&self) -> Option<&Timeframe> {
        match &self.payload {
            FeedPayload::Echo(echo) => Some(&echo.timeframe),
            FeedPayload::Halo(_) => None,
        }
    }

    pub fn is_halo(&self) -> bool {
        matches!(self.payload, FeedPayload::Halo(_))
    }

    pub fn is_echo(&self) -> bool {
        matches!(self.payload, FeedPayload::Echo(_))
    }
}

/// A message as delivered by the merge iterator: the message plus its feed
/// position, which is merged into the local timeframe on delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedMessageBlock {
    pub feed_key: FeedKey,
    pub seq: u64,
    pub message: FeedMessage,
}
